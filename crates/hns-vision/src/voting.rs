//! 多线程信息信号投票池
//!
//! N 个工作线程竞争消费同一个工作队列，各自识别信息信号上的数字并记录在
//! 私有列表中。`get_result()` 设置停止标志、等待全部线程退出，
//! 按完成顺序拼接结果后做多数投票。

use crate::error::VotingError;
use crate::image::Image;
use crate::perception::{PerceptionFactory, SignalKind, detect_digit};
use crate::tally::VoteTally;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// 投票池配置
#[derive(Debug, Clone, PartialEq)]
pub struct VotingConfig {
    /// 工作线程数（≥ 1）
    pub workers: usize,
    /// 单次取帧的最长等待时间，也是 `get_result()` 的最长等待时间
    pub poll_timeout: Duration,
    /// 要识别的信号类型
    pub signal_kind: SignalKind,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_timeout: Duration::from_secs(5),
            signal_kind: SignalKind::Info,
        }
    }
}

impl VotingConfig {
    pub fn validate(&self) -> Result<(), VotingError> {
        if self.workers == 0 {
            return Err(VotingError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.poll_timeout.is_zero() {
            return Err(VotingError::InvalidConfig("poll_timeout must be positive".into()));
        }
        Ok(())
    }
}

/// 单个工作线程的结果
struct WorkerReport {
    worker: usize,
    digits: Vec<u8>,
}

struct Running {
    handles: Vec<JoinHandle<()>>,
    reports: Receiver<WorkerReport>,
}

/// 投票池
pub struct VotingPool {
    config: VotingConfig,
    factory: Arc<dyn PerceptionFactory>,
    stop_flag: Arc<AtomicBool>,
    running: Option<Running>,
}

impl VotingPool {
    /// # 错误
    /// 配置非法时返回 `VotingError::InvalidConfig`
    pub fn new(config: VotingConfig, factory: Arc<dyn PerceptionFactory>) -> Result<Self, VotingError> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: None,
        })
    }

    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// 启动工作线程（不阻塞）
    pub fn run(&mut self, queue: Receiver<Image>) -> Result<(), VotingError> {
        if self.running.is_some() {
            return Err(VotingError::AlreadyRunning);
        }

        self.stop_flag.store(false, Ordering::Release);
        let (report_tx, report_rx) = crossbeam_channel::unbounded();
        let mut handles = Vec::with_capacity(self.config.workers);

        for worker in 0..self.config.workers {
            let queue = queue.clone();
            let report_tx = report_tx.clone();
            let factory = self.factory.clone();
            let stop_flag = self.stop_flag.clone();
            let config = self.config.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("hns-vote-{}", worker))
                .spawn(move || worker_loop(worker, config, factory, queue, stop_flag, report_tx));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // 已启动的线程随停止标志退出
                    self.stop_flag.store(true, Ordering::Release);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(VotingError::Spawn(e.to_string()));
                },
            }
        }

        info!("Started {} voting workers", self.config.workers);
        self.running = Some(Running {
            handles,
            reports: report_rx,
        });
        Ok(())
    }

    /// 停止所有工作线程并返回多数投票结果
    ///
    /// 阻塞至所有线程退出（最长约一个 `poll_timeout`）。没有任何票时返回 `Ok(None)`。
    ///
    /// # 错误
    /// - `VotingError::NotStarted`: 未调用 `run()`
    /// - `VotingError::WorkerPanicked`: 某个工作线程 panic（其余线程的结果被丢弃）
    pub fn get_result(&mut self) -> Result<Option<u8>, VotingError> {
        let running = self.running.take().ok_or(VotingError::NotStarted)?;
        self.stop_flag.store(true, Ordering::Release);

        // 工作线程退出（包括 panic 展开）时都会释放自己的发送端
        let mut tally = VoteTally::new();
        let mut order = Vec::with_capacity(running.handles.len());
        for report in running.reports.iter() {
            order.push(report.worker);
            tally.extend(report.digits);
        }

        let mut panicked = None;
        for (worker, handle) in running.handles.into_iter().enumerate() {
            if handle.join().is_err() {
                error!("Voting worker {} panicked", worker);
                panicked.get_or_insert(worker);
            }
        }
        if let Some(worker) = panicked {
            return Err(VotingError::WorkerPanicked(worker));
        }

        let winner = tally.winner();
        info!(
            "Majority vote over {} digits (workers finished in order {:?}): {:?}",
            tally.total(),
            order,
            winner
        );
        Ok(winner)
    }
}

impl Drop for VotingPool {
    fn drop(&mut self) {
        if self.running.is_some() {
            let _ = self.get_result();
        }
    }
}

fn worker_loop(
    worker: usize,
    config: VotingConfig,
    factory: Arc<dyn PerceptionFactory>,
    queue: Receiver<Image>,
    stop_flag: Arc<AtomicBool>,
    report_tx: Sender<WorkerReport>,
) {
    let mut digits = Vec::new();

    let classifiers = factory
        .signal_classifier()
        .and_then(|signal| Ok((signal, factory.digit_classifier()?)));
    let (mut signal_classifier, mut digit_classifier) = match classifiers {
        Ok(pair) => pair,
        Err(e) => {
            error!("Voting worker {}: cannot create classifiers: {}", worker, e);
            let _ = report_tx.send(WorkerReport { worker, digits });
            return;
        },
    };

    debug!("Voting worker {} started", worker);
    let kinds = [config.signal_kind];

    while !stop_flag.load(Ordering::Acquire) {
        let image = match queue.recv_timeout(config.poll_timeout) {
            Ok(image) => image,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let signal = match signal_classifier.detect(&image, &kinds) {
            Ok(Some(signal)) if signal.kind == config.signal_kind => signal,
            Ok(_) => continue,
            Err(e) => {
                trace!("Voting worker {}: signal detection failed: {}", worker, e);
                continue;
            },
        };

        match detect_digit(digit_classifier.as_mut(), &signal.image) {
            Ok(Some(digit)) => {
                debug!("Voting worker {}: detected {} signal {}", worker, signal.kind, digit);
                digits.push(digit);
            },
            Ok(None) => {},
            Err(e) => trace!("Voting worker {}: digit detection failed: {}", worker, e),
        }
    }

    debug!("Voting worker {} stopping with {:?}", worker, digits);
    let _ = report_tx.send(WorkerReport { worker, digits });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassificationError;
    use crate::mock::{ScriptedPerception, faulty_frame, signal_frame};
    use crate::perception::{DigitClassifier, SignalClassifier};

    fn config(workers: usize) -> VotingConfig {
        VotingConfig {
            workers,
            poll_timeout: Duration::from_millis(20),
            signal_kind: SignalKind::Info,
        }
    }

    fn info(digit: u8) -> Image {
        signal_frame(Some(SignalKind::Info), Some(digit))
    }

    #[test]
    fn test_config_validation() {
        assert!(VotingConfig::default().validate().is_ok());
        assert!(matches!(
            config(0).validate(),
            Err(VotingError::InvalidConfig(_))
        ));
        let zero_timeout = VotingConfig {
            poll_timeout: Duration::ZERO,
            ..config(1)
        };
        assert!(zero_timeout.validate().is_err());
        assert!(VotingPool::new(config(0), Arc::new(ScriptedPerception)).is_err());
    }

    #[test]
    fn test_get_result_without_run() {
        let mut pool = VotingPool::new(config(2), Arc::new(ScriptedPerception)).unwrap();
        assert_eq!(pool.get_result(), Err(VotingError::NotStarted));
    }

    #[test]
    fn test_majority_over_queued_frames() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pool = VotingPool::new(config(3), Arc::new(ScriptedPerception)).unwrap();
        pool.run(rx).unwrap();
        assert_eq!(pool.run(crossbeam_channel::never()), Err(VotingError::AlreadyRunning));

        for frame in [
            info(3),
            info(3),
            faulty_frame(),
            signal_frame(Some(SignalKind::Start), None),
            info(7),
            signal_frame(Some(SignalKind::Info), None),
            info(3),
            info(7),
        ] {
            tx.send(frame).unwrap();
        }

        // 等待队列被消费完
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !tx.is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(pool.get_result(), Ok(Some(3)));
        assert!(!pool.is_running());
    }

    #[test]
    fn test_no_votes() {
        let (_tx, rx) = crossbeam_channel::unbounded::<Image>();
        let mut pool = VotingPool::new(config(2), Arc::new(ScriptedPerception)).unwrap();
        pool.run(rx).unwrap();
        assert_eq!(pool.get_result(), Ok(None));
    }

    #[test]
    fn test_pool_can_run_again() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pool = VotingPool::new(config(1), Arc::new(ScriptedPerception)).unwrap();

        pool.run(rx.clone()).unwrap();
        assert_eq!(pool.get_result(), Ok(None));

        tx.send(info(5)).unwrap();
        pool.run(rx).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !tx.is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(pool.get_result(), Ok(Some(5)));
    }

    struct PanickingFactory;

    struct PanickingClassifier;

    impl SignalClassifier for PanickingClassifier {
        fn detect(
            &mut self,
            _image: &Image,
            _kinds: &[SignalKind],
        ) -> Result<Option<crate::perception::DetectedSignal>, ClassificationError> {
            panic!("classifier bug");
        }
    }

    impl PerceptionFactory for PanickingFactory {
        fn signal_classifier(&self) -> Result<Box<dyn SignalClassifier>, ClassificationError> {
            Ok(Box::new(PanickingClassifier))
        }

        fn digit_classifier(&self) -> Result<Box<dyn DigitClassifier>, ClassificationError> {
            Ok(Box::new(crate::mock::ScriptedDigits))
        }
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pool = VotingPool::new(config(1), Arc::new(PanickingFactory)).unwrap();
        pool.run(rx).unwrap();
        tx.send(info(1)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !tx.is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(pool.get_result(), Err(VotingError::WorkerPanicked(0)));
    }
}
