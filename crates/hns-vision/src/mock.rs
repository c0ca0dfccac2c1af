//! 脚本化感知模块
//!
//! 用于测试和 `hns-cli simulate`，不依赖摄像头和视觉模型。
//!
//! 合成帧的每一行都以两个标记字节开头：
//! - 第 0 字节：信号类型（`S` 起点、`I` 信息、`P` 停车、`E` 触发分类错误，其它为无信号）
//! - 第 1 字节：数字（0-9），其它值表示无数字
//!
//! 由于每一行相同，裁剪任意半幅后标记仍然可读。

use crate::error::{CaptureError, ClassificationError};
use crate::image::Image;
use crate::perception::{
    DetectedSignal, DigitClassifier, FrameSource, PerceptionFactory, SignalClassifier, SignalKind,
};
use std::time::Duration;

const MARK_START: u8 = b'S';
const MARK_INFO: u8 = b'I';
const MARK_STOP: u8 = b'P';
const MARK_ERROR: u8 = b'E';
const NO_DIGIT: u8 = 0xFF;

/// 合成帧尺寸
pub const FRAME_WIDTH: usize = 4;
pub const FRAME_HEIGHT: usize = 8;

fn marker(kind: Option<SignalKind>) -> u8 {
    match kind {
        Some(SignalKind::Start) => MARK_START,
        Some(SignalKind::Info) => MARK_INFO,
        Some(SignalKind::Stop) => MARK_STOP,
        None => 0,
    }
}

fn synth(mark: u8, digit: Option<u8>) -> Image {
    let mut row = [0u8; FRAME_WIDTH];
    row[0] = mark;
    row[1] = digit.unwrap_or(NO_DIGIT);
    Image::from_repeated_row(&row, FRAME_HEIGHT)
}

/// 生成带有指定信号和数字的合成帧
pub fn signal_frame(kind: Option<SignalKind>, digit: Option<u8>) -> Image {
    synth(marker(kind), digit)
}

/// 生成一个会让 [`ScriptedClassifier`] 返回错误的帧
pub fn faulty_frame() -> Image {
    synth(MARK_ERROR, None)
}

/// 按标记字节分类的信号分类器
#[derive(Debug, Default, Clone)]
pub struct ScriptedClassifier;

impl SignalClassifier for ScriptedClassifier {
    fn detect(
        &mut self,
        image: &Image,
        kinds: &[SignalKind],
    ) -> Result<Option<DetectedSignal>, ClassificationError> {
        let kind = match image.data().first() {
            Some(&MARK_START) => SignalKind::Start,
            Some(&MARK_INFO) => SignalKind::Info,
            Some(&MARK_STOP) => SignalKind::Stop,
            Some(&MARK_ERROR) => {
                return Err(ClassificationError::Failed("scripted failure".into()));
            },
            _ => return Ok(None),
        };

        if !kinds.contains(&kind) {
            return Ok(None);
        }
        Ok(Some(DetectedSignal {
            kind,
            image: image.clone(),
            score: Some(1.0),
        }))
    }
}

/// 读取第 1 字节的数字识别器
#[derive(Debug, Default, Clone)]
pub struct ScriptedDigits;

impl DigitClassifier for ScriptedDigits {
    fn detect(&mut self, image: &Image) -> Result<Option<u8>, ClassificationError> {
        Ok(image.data().get(1).copied().filter(|&d| d != NO_DIGIT))
    }
}

/// 为每个工作线程创建脚本化分类器
#[derive(Debug, Default, Clone)]
pub struct ScriptedPerception;

impl PerceptionFactory for ScriptedPerception {
    fn signal_classifier(&self) -> Result<Box<dyn SignalClassifier>, ClassificationError> {
        Ok(Box::new(ScriptedClassifier))
    }

    fn digit_classifier(&self) -> Result<Box<dyn DigitClassifier>, ClassificationError> {
        Ok(Box::new(ScriptedDigits))
    }
}

/// 分段回放的帧源
///
/// 每次 `reset()` 切换到下一段脚本，模拟摄像头在两次重置之间看到不同的场景；
/// 一段播放完后重复该段最后一帧。超过最后一段后停留在最后一段。
pub struct PhasedSource {
    segments: Vec<Vec<Image>>,
    segment: usize,
    position: usize,
    interval: Duration,
    remaining: Option<usize>,
}

impl PhasedSource {
    /// `interval`: 每帧之间的间隔（模拟帧率）
    pub fn new(segments: Vec<Vec<Image>>, interval: Duration) -> Self {
        Self {
            segments,
            segment: 0,
            position: 0,
            interval,
            remaining: None,
        }
    }

    /// 最多产生 `frames` 帧，之后返回 `CaptureError::Exhausted`
    pub fn with_limit(mut self, frames: usize) -> Self {
        self.remaining = Some(frames);
        self
    }

    /// 当前段序号
    pub fn segment(&self) -> usize {
        self.segment
    }
}

impl FrameSource for PhasedSource {
    fn next_frame(&mut self) -> Result<Image, CaptureError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(CaptureError::Exhausted);
            }
            *remaining -= 1;
        }

        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }

        let index = self.segment.min(self.segments.len().saturating_sub(1));
        let frames = self.segments.get(index).ok_or(CaptureError::Exhausted)?;
        let frame = frames
            .get(self.position)
            .or_else(|| frames.last())
            .cloned()
            .ok_or(CaptureError::Exhausted)?;

        self.position = (self.position + 1).min(frames.len());
        Ok(frame)
    }

    fn reset(&mut self) {
        self.segment += 1;
        self.position = 0;
    }
}
