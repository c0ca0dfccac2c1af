//! 图像缓冲区
//!
//! 行优先、逐像素交错存储。像素数据放在 `Arc<[u8]>` 中，克隆只增加引用计数，
//! 同一帧可以同时交给控制线程和投票线程。

use crate::error::CaptureError;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    data: Arc<[u8]>,
}

impl Image {
    /// # 错误
    /// - `CaptureError::ImageDimensions`: `width * height * channels` 溢出
    /// - `CaptureError::InvalidImage`: 数据长度不等于 `width * height * channels`
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: impl Into<Arc<[u8]>>,
    ) -> Result<Self, CaptureError> {
        let data = data.into();
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(CaptureError::ImageDimensions {
                width,
                height,
                channels,
            })?;
        if data.len() != expected {
            return Err(CaptureError::InvalidImage {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// 单通道图像，每一行都是 `row`
    pub fn from_repeated_row(row: &[u8], height: usize) -> Self {
        let data: Vec<u8> = row.iter().copied().cycle().take(row.len() * height).collect();
        Self {
            width: row.len(),
            height,
            channels: 1,
            data: data.into(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 每行字节数
    pub fn stride(&self) -> usize {
        self.width * self.channels
    }

    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.stride();
        Some(&self.data[y * stride..(y + 1) * stride])
    }

    /// 截取 `[start, end)` 行，越界部分被截断
    pub fn crop_rows(&self, start: usize, end: usize) -> Image {
        let end = end.min(self.height);
        let start = start.min(end);
        let stride = self.stride();
        Image {
            width: self.width,
            height: end - start,
            channels: self.channels,
            data: Arc::from(&self.data[start * stride..end * stride]),
        }
    }

    /// 上半部分（奇数高度时不含中间行）
    pub fn top_half(&self) -> Image {
        self.crop_rows(0, self.height / 2)
    }

    /// 下半部分（奇数高度时包含中间行）
    pub fn bottom_half(&self) -> Image {
        self.crop_rows(self.height / 2, self.height)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Image {
        let data: Vec<u8> = (0..width * height).map(|i| (i / width) as u8).collect();
        Image::new(width, height, 1, data).unwrap()
    }

    #[test]
    fn test_new_checks_length() {
        let err = Image::new(4, 2, 3, vec![0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            CaptureError::InvalidImage {
                expected: 24,
                actual: 10
            }
        );
    }

    #[test]
    fn test_new_rejects_overflowing_dimensions() {
        let err = Image::new(usize::MAX, 2, 3, vec![0u8; 6]).unwrap_err();
        assert_eq!(
            err,
            CaptureError::ImageDimensions {
                width: usize::MAX,
                height: 2,
                channels: 3
            }
        );
    }

    #[test]
    fn test_from_repeated_row() {
        let image = Image::from_repeated_row(&[1, 2], 3);
        assert_eq!((image.width(), image.height(), image.channels()), (2, 3, 1));
        assert_eq!(image.data(), &[1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn test_halves() {
        let image = ramp(3, 5);
        let top = image.top_half();
        let bottom = image.bottom_half();

        assert_eq!(top.height(), 2);
        assert_eq!(bottom.height(), 3);
        assert_eq!(top.row(0), Some(&[0u8, 0, 0][..]));
        assert_eq!(bottom.row(0), Some(&[2u8, 2, 2][..]));
        assert_eq!(bottom.row(3), None);
    }

    #[test]
    fn test_crop_rows_clamps() {
        let image = ramp(2, 4);
        assert_eq!(image.crop_rows(3, 100).height(), 1);
        assert!(image.crop_rows(10, 2).is_empty());
    }

    #[test]
    fn test_clone_shares_pixels() {
        let image = ramp(2, 2);
        let copy = image.clone();
        assert_eq!(image.data().as_ptr(), copy.data().as_ptr());
    }
}
