//! 帧编解码模块
//!
//! 实现串口链路的字节填充（Byte Stuffing）编码：
//! - `encode`: payload → 帧（永不失败）
//! - `decode`: 帧 → payload
//! - `extract_frame`: 从接收缓冲区中切出一个完整帧

use crate::FrameError;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// 帧起始标记
pub const START: u8 = 0x7E;
/// 帧结束标记
pub const STOP: u8 = 0x7D;
/// 转义标记
pub const ESCAPE: u8 = 0x7C;
/// 转义异或掩码
pub const ESCAPE_XOR_MASK: u8 = 0x20;

/// 线上帧（含 START/STOP 标记，payload 已转义）
///
/// 下行指令帧最长 6 字节，上行状态帧最长 14 字节，16 字节栈空间足以避免堆分配。
pub type Frame = SmallVec<[u8; 16]>;

/// 接收字节队列（IO 线程持有）
pub type ByteQueue = VecDeque<u8>;

/// 是否为需要转义的保留字节
#[inline]
pub fn is_reserved(byte: u8) -> bool {
    byte == START || byte == STOP || byte == ESCAPE
}

/// 将 payload 编码为一个完整帧
///
/// # Example
///
/// ```
/// use hns_protocol::codec::{encode, START, STOP, ESCAPE};
///
/// let frame = encode(&[0x01, 0x7E]);
/// assert_eq!(frame.as_slice(), &[START, 0x01, ESCAPE, 0x5E, STOP]);
/// ```
pub fn encode(payload: &[u8]) -> Frame {
    let mut frame = Frame::with_capacity(payload.len() + 2);
    frame.push(START);

    for &byte in payload {
        if is_reserved(byte) {
            frame.push(ESCAPE);
            frame.push(byte ^ ESCAPE_XOR_MASK);
        } else {
            frame.push(byte);
        }
    }

    frame.push(STOP);
    frame
}

/// 解码一个完整帧，返回去转义后的 payload
///
/// 位于 payload 最后一个位置、没有后继字节的 ESCAPE 会被静默丢弃，
/// 不视为错误。
///
/// # 错误
/// - `FrameError::InvalidFrame`: 长度小于 2，或首字节不是 START，或尾字节不是 STOP
pub fn decode(frame: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = frame.len();
    if len < 2 || frame[0] != START || frame[len - 1] != STOP {
        return Err(FrameError::InvalidFrame { len });
    }

    let body = &frame[1..len - 1];
    let mut payload = Vec::with_capacity(body.len());
    let mut bytes = body.iter();

    while let Some(&byte) = bytes.next() {
        if byte == ESCAPE {
            if let Some(&escaped) = bytes.next() {
                payload.push(escaped ^ ESCAPE_XOR_MASK);
            }
        } else {
            payload.push(byte);
        }
    }

    Ok(payload)
}

/// 从接收缓冲区中取出下一个完整帧
///
/// 1. 丢弃第一个 START 之前的所有字节（找不到 START 时缓冲区被清空，返回 `None`）
/// 2. 累积字节直到遇到 STOP；若中途再次遇到 START，之前累积的半帧作废，从新的 START 重新开始
/// 3. 缓冲区耗尽仍未遇到 STOP：已取出的字节按原顺序放回缓冲区前端，返回 `None`
///
/// 可以循环调用，直到返回 `None`，以取出一次读取中包含的多个帧。
pub fn extract_frame(buffer: &mut ByteQueue) -> Option<Frame> {
    loop {
        match buffer.pop_front() {
            Some(START) => break,
            Some(_) => continue,
            None => return None,
        }
    }

    let mut frame = Frame::new();
    frame.push(START);

    while let Some(byte) = buffer.pop_front() {
        match byte {
            START => {
                // 上一个 START 之后没有 STOP，已累积的内容是残帧
                frame.clear();
                frame.push(START);
            },
            STOP => {
                frame.push(STOP);
                return Some(frame);
            },
            _ => frame.push(byte),
        }
    }

    // 帧不完整：放回缓冲区，等待后续字节
    for &byte in frame.iter().rev() {
        buffer.push_front(byte);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(bytes: &[u8]) -> ByteQueue {
        bytes.iter().copied().collect()
    }

    #[test]
    fn test_encode_plain_payload() {
        let frame = encode(&[0x01, 0x02, 0x03]);
        assert_eq!(frame.as_slice(), &[START, 0x01, 0x02, 0x03, STOP]);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode(&[]);
        assert_eq!(frame.as_slice(), &[START, STOP]);
    }

    #[test]
    fn test_encode_escapes_reserved_bytes() {
        let frame = encode(&[START, STOP, ESCAPE]);
        assert_eq!(
            frame.as_slice(),
            &[START, ESCAPE, 0x5E, ESCAPE, 0x5D, ESCAPE, 0x5C, STOP]
        );
    }

    #[test]
    fn test_decode_escaped_payload() {
        let payload = decode(&[START, 0x10, ESCAPE, 0x5E, 0x20, STOP]).unwrap();
        assert_eq!(payload, vec![0x10, START, 0x20]);
    }

    #[test]
    fn test_decode_rejects_bad_delimiters() {
        assert_eq!(decode(&[]), Err(FrameError::InvalidFrame { len: 0 }));
        assert_eq!(decode(&[START]), Err(FrameError::InvalidFrame { len: 1 }));
        assert!(decode(&[0x00, 0x01, STOP]).is_err());
        assert!(decode(&[START, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_decode_empty_frame() {
        assert_eq!(decode(&[START, STOP]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_drops_trailing_escape() {
        let payload = decode(&[START, 0x11, ESCAPE, STOP]).unwrap();
        assert_eq!(payload, vec![0x11]);
    }

    #[test]
    fn test_extract_single_frame() {
        let mut buffer = queue(&[START, 0x01, 0x02, STOP]);
        let frame = extract_frame(&mut buffer).unwrap();
        assert_eq!(frame.as_slice(), &[START, 0x01, 0x02, STOP]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_extract_discards_leading_garbage() {
        let mut buffer = queue(&[0xAA, 0xBB, START, 0x01, STOP, 0xCC]);
        let frame = extract_frame(&mut buffer).unwrap();
        assert_eq!(frame.as_slice(), &[START, 0x01, STOP]);
        assert_eq!(buffer, queue(&[0xCC]));
    }

    #[test]
    fn test_extract_without_start_clears_buffer() {
        let mut buffer = queue(&[0x01, 0x02, STOP]);
        assert!(extract_frame(&mut buffer).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_extract_incomplete_frame_is_restored() {
        let mut buffer = queue(&[0x99, START, 0x01, 0x02]);
        assert!(extract_frame(&mut buffer).is_none());
        // 前导垃圾字节被丢弃，残帧保留
        assert_eq!(buffer, queue(&[START, 0x01, 0x02]));

        buffer.extend([0x03, STOP]);
        let frame = extract_frame(&mut buffer).unwrap();
        assert_eq!(frame.as_slice(), &[START, 0x01, 0x02, 0x03, STOP]);
    }

    #[test]
    fn test_extract_restarts_on_second_start() {
        let mut buffer = queue(&[START, 0x01, 0x02, START, 0x03, STOP]);
        let frame = extract_frame(&mut buffer).unwrap();
        assert_eq!(frame.as_slice(), &[START, 0x03, STOP]);
    }

    #[test]
    fn test_extract_multiple_frames() {
        let mut buffer = ByteQueue::new();
        buffer.extend(encode(&[0x01]));
        buffer.extend(encode(&[0x02, START]));
        buffer.extend([START, 0x05]);

        let first = extract_frame(&mut buffer).unwrap();
        assert_eq!(decode(&first).unwrap(), vec![0x01]);
        let second = extract_frame(&mut buffer).unwrap();
        assert_eq!(decode(&second).unwrap(), vec![0x02, START]);
        assert!(extract_frame(&mut buffer).is_none());
        assert_eq!(buffer, queue(&[START, 0x05]));
    }
}
