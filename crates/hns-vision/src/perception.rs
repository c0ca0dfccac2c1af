//! 感知协作者接口
//!
//! 信号定位、数字识别、摄像头和距离标定都是可替换的外部模块，
//! 控制核心只通过这里的 trait 使用它们。

use crate::error::{CaptureError, ClassificationError};
use crate::image::Image;
use std::fmt;

/// 赛道信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// 起点信号（计圈）
    Start,
    /// 信息信号（给出停车数字）
    Info,
    /// 停车信号（带数字）
    Stop,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Start => write!(f, "START"),
            SignalKind::Info => write!(f, "INFO"),
            SignalKind::Stop => write!(f, "STOP"),
        }
    }
}

/// 检测到的信号
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSignal {
    pub kind: SignalKind,
    /// 信号区域图像（数字识别和距离估计的输入）
    pub image: Image,
    /// 分类器给出的匹配分数（可选）
    pub score: Option<f64>,
}

/// 按信号类型裁剪半幅画面
///
/// 停车信号位于画面下半部分，起点和信息信号位于上半部分；
/// 同时请求时以停车信号为准。其余情况返回原图。
pub fn half_frame_crop(image: &Image, kinds: &[SignalKind]) -> Image {
    if kinds.contains(&SignalKind::Stop) {
        image.bottom_half()
    } else if kinds.contains(&SignalKind::Info) || kinds.contains(&SignalKind::Start) {
        image.top_half()
    } else {
        image.clone()
    }
}

/// 摄像头帧源
///
/// 产生惰性、无限、不可重启的图像序列。
pub trait FrameSource: Send {
    /// 阻塞直到下一帧可用
    fn next_frame(&mut self) -> Result<Image, CaptureError>;

    /// 丢弃已缓冲的帧，下一次 `next_frame()` 返回新拍摄的画面
    fn reset(&mut self) {}
}

/// 信号分类器
///
/// 每个线程持有独立实例，实现可以保留内部状态。
pub trait SignalClassifier: Send {
    /// 在 `image` 中查找 `kinds` 之一；返回的信号类型必须属于 `kinds`
    fn detect(
        &mut self,
        image: &Image,
        kinds: &[SignalKind],
    ) -> Result<Option<DetectedSignal>, ClassificationError>;

    fn crop(&self, image: &Image, kinds: &[SignalKind]) -> Image {
        half_frame_crop(image, kinds)
    }

    fn crop_and_detect(
        &mut self,
        image: &Image,
        kinds: &[SignalKind],
    ) -> Result<Option<DetectedSignal>, ClassificationError> {
        let cropped = self.crop(image, kinds);
        self.detect(&cropped, kinds)
    }
}

/// 数字识别器
pub trait DigitClassifier: Send {
    /// 识别信号图像上的数字，没有数字时返回 `None`
    fn detect(&mut self, image: &Image) -> Result<Option<u8>, ClassificationError>;
}

/// 识别数字并校验范围（0-9）
pub fn detect_digit(
    classifier: &mut dyn DigitClassifier,
    image: &Image,
) -> Result<Option<u8>, ClassificationError> {
    match classifier.detect(image)? {
        Some(digit) if digit > 9 => Err(ClassificationError::InvalidDigit(digit)),
        other => Ok(other),
    }
}

/// 距离估计（毫米）
pub trait DistanceEstimator: Send + Sync {
    fn estimate(&self, image: &Image) -> f64;
}

/// 线性距离模型：`distance = slope × height + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDistanceEstimator {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearDistanceEstimator {
    pub const DEFAULT_SLOPE: f64 = -4.1225;
    pub const DEFAULT_INTERCEPT: f64 = 340.02;

    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }
}

impl Default for LinearDistanceEstimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SLOPE, Self::DEFAULT_INTERCEPT)
    }
}

impl DistanceEstimator for LinearDistanceEstimator {
    fn estimate(&self, image: &Image) -> f64 {
        self.slope * image.height() as f64 + self.intercept
    }
}

/// 为每个工作线程创建独立的分类器实例
pub trait PerceptionFactory: Send + Sync {
    fn signal_classifier(&self) -> Result<Box<dyn SignalClassifier>, ClassificationError>;

    fn digit_classifier(&self) -> Result<Box<dyn DigitClassifier>, ClassificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_height(height: usize) -> Image {
        Image::new(2, height, 1, vec![0u8; 2 * height]).unwrap()
    }

    #[test]
    fn test_half_frame_crop() {
        let image = image_with_height(10);
        assert_eq!(half_frame_crop(&image, &[SignalKind::Stop]).height(), 5);
        assert_eq!(half_frame_crop(&image, &[SignalKind::Start, SignalKind::Info]).height(), 5);
        assert_eq!(half_frame_crop(&image, &[]).height(), 10);

        let image = image_with_height(7);
        // 停车信号优先，取下半部分（含中间行）
        assert_eq!(
            half_frame_crop(&image, &[SignalKind::Info, SignalKind::Stop]).height(),
            4
        );
    }

    #[test]
    fn test_linear_distance() {
        let estimator = LinearDistanceEstimator::default();
        let distance = estimator.estimate(&image_with_height(40));
        assert!((distance - (340.02 - 164.9)).abs() < 1e-9);
        assert_eq!(estimator.estimate(&image_with_height(0)), 340.02);
    }

    struct Fixed(Option<u8>);

    impl DigitClassifier for Fixed {
        fn detect(&mut self, _image: &Image) -> Result<Option<u8>, ClassificationError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_detect_digit_range() {
        let image = image_with_height(1);
        assert_eq!(detect_digit(&mut Fixed(Some(7)), &image), Ok(Some(7)));
        assert_eq!(detect_digit(&mut Fixed(None), &image), Ok(None));
        assert_eq!(
            detect_digit(&mut Fixed(Some(10)), &image),
            Err(ClassificationError::InvalidDigit(10))
        );
    }

    #[test]
    fn test_signal_kind_display() {
        assert_eq!(SignalKind::Stop.to_string(), "STOP");
    }
}
