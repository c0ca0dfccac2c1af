//! 帧编解码属性测试
//!
//! 1. decode(encode(p)) == p
//! 2. encode 输出的 payload 区域不含未转义的保留字节
//! 3. 帧被拆成两次写入缓冲区时，提取结果与一次写入相同

use hns_protocol::codec::*;
use proptest::prelude::*;

fn drain(buffer: &mut ByteQueue) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = extract_frame(buffer) {
        frames.push(frame);
    }
    frames
}

proptest! {
    #[test]
    fn prop_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        let frame = encode(&payload);
        prop_assert_eq!(decode(&frame).unwrap(), payload);
    }

    #[test]
    fn prop_no_unescaped_reserved_bytes(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        let frame = encode(&payload);
        prop_assert_eq!(frame[0], START);
        prop_assert_eq!(frame[frame.len() - 1], STOP);

        let body = &frame[1..frame.len() - 1];
        let mut index = 0;
        while index < body.len() {
            let byte = body[index];
            prop_assert!(byte != START && byte != STOP);
            if byte == ESCAPE {
                // ESCAPE 后必须紧跟一个被转义的字节
                prop_assert!(index + 1 < body.len());
                prop_assert!(!is_reserved(body[index + 1]));
                index += 2;
            } else {
                index += 1;
            }
        }
    }

    #[test]
    fn prop_split_fill_yields_same_frame(
        payload in proptest::collection::vec(any::<u8>(), 0..32),
        split_seed in any::<usize>(),
    ) {
        let frame = encode(&payload);
        let split = split_seed % (frame.len() + 1);

        let mut whole = ByteQueue::new();
        whole.extend(frame.iter().copied());
        let expected = drain(&mut whole);

        let mut partial = ByteQueue::new();
        partial.extend(frame[..split].iter().copied());
        let mut frames = drain(&mut partial);
        partial.extend(frame[split..].iter().copied());
        frames.extend(drain(&mut partial));

        prop_assert_eq!(frames, expected);
        prop_assert!(partial.is_empty());
    }

    #[test]
    fn prop_extract_survives_garbage_prefix(
        garbage in proptest::collection::vec(any::<u8>().prop_filter("no START", |b| *b != START), 0..16),
        payload in proptest::collection::vec(any::<u8>(), 0..16),
    ) {
        let mut buffer = ByteQueue::new();
        buffer.extend(garbage);
        buffer.extend(encode(&payload));

        let frame = extract_frame(&mut buffer).unwrap();
        prop_assert_eq!(decode(&frame).unwrap(), payload);
    }
}
