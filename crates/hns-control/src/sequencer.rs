//! # 比赛流程状态机
//!
//! 单个控制线程按固定顺序推进五个阶段（见 [`Phase`]）：
//!
//! 1. **AwaitingCargo**: 启动投票池和通信运行时，阻塞等待吊臂装货
//! 2. **LapCounting**: 启动异步采集，全速行驶；对最新帧检测起点信号并去抖计圈，
//!    达到圈数后减速、取投票结果、停止采集、后台播报数字
//! 3. **Approaching**: 逐帧查找带有投票数字的停车信号，找到后停车并等待零速
//! 4. **Homing**: 再拍一帧估计到停车信号的距离，下发剩余距离
//! 5. **Done**: 等待、结束提示音、关闭通信
//!
//! 其余线程（RX、采集、投票）只通过运行时、邮箱和锁存器与本线程交互。
//! [`SequencerHandle`] 可以在任意线程上查询阶段或中止流程。

use crate::audio::{AudioAnnouncer, BeepAnnouncer, LogTone};
use crate::cargo::{CargoLatch, CargoWait};
use crate::error::SequencerError;
use crate::laps::LapCounter;
use crate::phase::{AtomicPhase, Phase};
use hns_driver::{CommunicationRuntime, DriverError, StatusSnapshot};
use hns_vision::{
    CaptureError, CaptureMailbox, DigitClassifier, DistanceEstimator, FrameSource, Image,
    LinearDistanceEstimator, PerceptionFactory, SignalClassifier, SignalKind, VotingConfig,
    VotingPool, detect_digit, half_frame_crop,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 流程参数
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerSettings {
    /// 计圈速度（%）
    pub full_speed: i32,
    /// 寻找停车信号的速度（%）
    pub stop_speed: i32,
    pub laps: u32,
    /// 起点信号去抖窗口
    pub debounce: Duration,
    /// 计圈时等待最新帧的超时
    pub latest_timeout: Duration,
    /// 停车、下发距离后的等待
    pub settle: Duration,
    /// 结束提示音之前的等待
    pub final_wait: Duration,
    /// 单次等待零速的超时
    pub stop_poll_timeout: Duration,
    pub final_cue_hz: u32,
    pub final_cue: Duration,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            full_speed: 60,
            stop_speed: 20,
            laps: 3,
            debounce: Duration::from_millis(500),
            latest_timeout: Duration::from_millis(500),
            settle: Duration::from_secs(1),
            final_wait: Duration::from_secs(10),
            stop_poll_timeout: Duration::from_secs(1),
            final_cue_hz: 3000,
            final_cue: Duration::from_secs(1),
        }
    }
}

/// 一次完整运行的结果
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub laps: u32,
    pub voted_digit: u8,
    /// 接近阶段检查过的帧数（含匹配帧）
    pub stop_frames_inspected: u64,
    /// 下发的剩余距离；归位帧中没有停车信号或估计值超出指令范围时为 `None`
    pub remaining_distance_mm: Option<f64>,
}

/// 跨线程句柄：查询阶段、中止运行
#[derive(Clone)]
pub struct SequencerHandle {
    phase: Arc<AtomicPhase>,
    abort: Arc<AtomicBool>,
    cargo: Arc<CargoLatch>,
}

impl SequencerHandle {
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// 请求中止（`run()` 在下一个检查点返回 `SequencerError::Aborted`）
    pub fn abort(&self) {
        if !self.abort.swap(true, Ordering::AcqRel) {
            warn!("Abort requested in phase {}", self.phase.get());
        }
        self.cargo.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }
}

/// 比赛流程控制器
pub struct ControlSequencer {
    runtime: CommunicationRuntime,
    mailbox: CaptureMailbox,
    voting: VotingPool,
    source: Option<Box<dyn FrameSource>>,
    signals: Box<dyn SignalClassifier>,
    digits: Box<dyn DigitClassifier>,
    distance: Box<dyn DistanceEstimator>,
    announcer: Arc<dyn AudioAnnouncer>,
    announcement: Option<JoinHandle<()>>,
    settings: SequencerSettings,
    cargo: Arc<CargoLatch>,
    phase: Arc<AtomicPhase>,
    abort: Arc<AtomicBool>,
}

impl ControlSequencer {
    /// 组装控制器
    ///
    /// 控制线程自己的信号分类器和数字识别器同样由 `factory` 创建。
    /// 默认使用线性距离模型和只写日志的蜂鸣器。
    ///
    /// # 错误
    /// - `SequencerError::Voting`: 投票配置非法
    /// - `SequencerError::Perception`: 无法创建分类器
    pub fn new(
        runtime: CommunicationRuntime,
        source: Box<dyn FrameSource>,
        factory: Arc<dyn PerceptionFactory>,
        voting: VotingConfig,
        settings: SequencerSettings,
    ) -> Result<Self, SequencerError> {
        let signals = factory.signal_classifier()?;
        let digits = factory.digit_classifier()?;
        let voting = VotingPool::new(voting, factory)?;

        Ok(Self {
            runtime,
            mailbox: CaptureMailbox::new(),
            voting,
            source: Some(source),
            signals,
            digits,
            distance: Box::new(LinearDistanceEstimator::default()),
            announcer: Arc::new(BeepAnnouncer::new(LogTone, Default::default())),
            announcement: None,
            settings,
            cargo: Arc::new(CargoLatch::new()),
            phase: Arc::new(AtomicPhase::new(Phase::Idle)),
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_distance_estimator(mut self, estimator: Box<dyn DistanceEstimator>) -> Self {
        self.distance = estimator;
        self
    }

    pub fn with_announcer(mut self, announcer: Arc<dyn AudioAnnouncer>) -> Self {
        self.announcer = announcer;
        self
    }

    pub fn handle(&self) -> SequencerHandle {
        SequencerHandle {
            phase: self.phase.clone(),
            abort: self.abort.clone(),
            cargo: self.cargo.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn runtime(&self) -> &CommunicationRuntime {
        &self.runtime
    }

    /// 执行完整流程（只能调用一次）
    ///
    /// 出错或被中止时会尽量让车辆停下，然后停止所有后台线程。
    pub fn run(&mut self) -> Result<RunReport, SequencerError> {
        let phase = self.phase.get();
        if phase != Phase::Idle {
            return Err(SequencerError::AlreadyRan(phase));
        }

        let result = self.run_phases();
        if let Err(e) = &result {
            error!("Run failed in phase {}: {}", self.phase.get(), e);
            self.halt();
        }
        self.join_announcement();
        result
    }

    fn run_phases(&mut self) -> Result<RunReport, SequencerError> {
        self.await_cargo()?;
        let (laps, voted_digit) = self.count_laps()?;
        let stop_frames_inspected = self.approach(voted_digit)?;
        let remaining_distance_mm = self.home()?;
        self.finish()?;

        Ok(RunReport {
            laps,
            voted_digit,
            stop_frames_inspected,
            remaining_distance_mm,
        })
    }

    fn enter(&self, phase: Phase) {
        info!("Phase {} -> {}", self.phase.get(), phase);
        self.phase.set(phase);
    }

    fn check_abort(&self) -> Result<(), SequencerError> {
        if self.abort.load(Ordering::Acquire) {
            return Err(SequencerError::Aborted);
        }
        Ok(())
    }

    fn pause(&self, duration: Duration) -> Result<(), SequencerError> {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
        self.check_abort()
    }

    fn source_mut(&mut self) -> Result<&mut Box<dyn FrameSource>, SequencerError> {
        self.source
            .as_mut()
            .ok_or(SequencerError::Capture(CaptureError::NotRunning))
    }

    fn await_cargo(&mut self) -> Result<(), SequencerError> {
        self.enter(Phase::AwaitingCargo);

        let cargo = self.cargo.clone();
        self.runtime
            .register_status_handler(Arc::new(move |status: &StatusSnapshot| {
                debug!(
                    target: "telemetry",
                    speed = status.current_speed,
                    accel_x = status.accel_x,
                    accel_y = status.accel_y,
                    wheel_cycles = status.wheel_cycles,
                    status_byte = status.status_byte,
                    "status"
                );
                if status.cargo_picked() {
                    cargo.set();
                }
            }));

        self.voting.run(self.mailbox.work_queue())?;
        self.runtime.start()?;

        match self.cargo.wait() {
            CargoWait::Picked => Ok(()),
            CargoWait::Cancelled => Err(SequencerError::Aborted),
        }
    }

    fn count_laps(&mut self) -> Result<(u32, u8), SequencerError> {
        self.enter(Phase::LapCounting);

        let source = self.source.take().ok_or(CaptureError::NotRunning)?;
        self.mailbox.start(
            source,
            Box::new(|image: &Image| half_frame_crop(image, &[SignalKind::Start, SignalKind::Info])),
        )?;
        self.runtime.set_target_speed(self.settings.full_speed);

        let mut counter = LapCounter::new(self.settings.debounce, Instant::now());
        while counter.laps() < self.settings.laps {
            self.check_abort()?;

            let Some(image) = self.mailbox.latest(self.settings.latest_timeout) else {
                if !self.mailbox.is_running() {
                    // 采集线程已退出：回收帧源后报告
                    self.source = Some(self.mailbox.stop()?);
                    return Err(CaptureError::Exhausted.into());
                }
                continue;
            };

            let detected = match self.signals.detect(&image, &[SignalKind::Start]) {
                Ok(detected) => detected.is_some_and(|signal| signal.kind == SignalKind::Start),
                Err(e) => {
                    debug!("Start signal classification failed: {}", e);
                    false
                },
            };
            if detected && counter.record(Instant::now()) {
                info!("Lap {} of {}", counter.laps(), self.settings.laps);
            }
        }

        self.runtime.set_target_speed(self.settings.stop_speed);
        let voted = self.voting.get_result()?;
        self.source = Some(self.mailbox.stop()?);

        let digit = voted.ok_or(SequencerError::NoVote)?;
        info!("Voted stop digit: {}", digit);
        self.spawn_announcement(digit);

        Ok((counter.laps(), digit))
    }

    fn spawn_announcement(&mut self, digit: u8) {
        let announcer = self.announcer.clone();
        let spawned = std::thread::Builder::new()
            .name("hns-sound".into())
            .spawn(move || announcer.announce(digit));
        match spawned {
            Ok(handle) => self.announcement = Some(handle),
            Err(e) => warn!("Failed to spawn announcement thread: {}", e),
        }
    }

    fn join_announcement(&mut self) {
        if let Some(handle) = self.announcement.take()
            && handle.join().is_err()
        {
            warn!("Announcement thread panicked");
        }
    }

    /// 在画面下半部分查找停车信号并识别数字
    fn stop_digit(&mut self, image: &Image) -> Option<(Image, Option<u8>)> {
        let signal = match self.signals.crop_and_detect(image, &[SignalKind::Stop]) {
            Ok(Some(signal)) if signal.kind == SignalKind::Stop => signal,
            Ok(Some(signal)) => {
                debug!("Ignoring {} signal while looking for STOP", signal.kind);
                return None;
            },
            Ok(None) => return None,
            Err(e) => {
                debug!("Stop signal classification failed: {}", e);
                return None;
            },
        };
        let digit = match detect_digit(self.digits.as_mut(), &signal.image) {
            Ok(digit) => digit,
            Err(e) => {
                debug!("Stop digit classification failed: {}", e);
                None
            },
        };
        Some((signal.image, digit))
    }

    fn next_frame(&mut self) -> Result<Image, SequencerError> {
        loop {
            match self.source_mut()?.next_frame() {
                Ok(image) => return Ok(image),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    debug!("Skipping frame: {}", e);
                    self.check_abort()?;
                },
            }
        }
    }

    fn approach(&mut self, target: u8) -> Result<u64, SequencerError> {
        self.enter(Phase::Approaching);
        self.source_mut()?.reset();

        let mut inspected = 0u64;
        loop {
            self.check_abort()?;
            let image = self.next_frame()?;
            inspected += 1;

            match self.stop_digit(&image) {
                Some((_, Some(digit))) if digit == target => break,
                Some((_, Some(digit))) => debug!("Stop signal {} does not match {}", digit, target),
                Some((_, None)) => debug!("Stop signal without a readable digit"),
                None => debug!("No stop signal in frame"),
            }
        }

        info!("Found stop signal {} after {} frames", target, inspected);
        self.runtime.set_target_speed(0);
        self.wait_until_stopped()?;
        self.pause(self.settings.settle)?;
        Ok(inspected)
    }

    fn wait_until_stopped(&self) -> Result<(), SequencerError> {
        loop {
            match self
                .runtime
                .wait_for_status(|s| s.is_stopped(), self.settings.stop_poll_timeout)
            {
                Ok(_) => {
                    info!("Vehicle stopped");
                    return Ok(());
                },
                Err(DriverError::Timeout) => {
                    debug!("Still waiting for zero speed");
                    self.check_abort()?;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn home(&mut self) -> Result<Option<f64>, SequencerError> {
        self.enter(Phase::Homing);
        self.source_mut()?.reset();

        let image = self.next_frame()?;
        let distance = match self.stop_digit(&image) {
            Some((signal, _)) => {
                let distance = self.distance.estimate(&signal);
                // 无法编码的距离会被 TX 线程丢弃，并让之后的指令一起失效
                match self.runtime.command().with_distance_mm(distance).to_payload() {
                    Ok(_) => {
                        self.runtime.set_distance_to_go(distance);
                        Some(distance)
                    },
                    Err(e) => {
                        warn!("Estimated distance {:.1} mm cannot be sent: {}", distance, e);
                        None
                    },
                }
            },
            None => {
                warn!("No stop signal visible for homing, distance left unchanged");
                None
            },
        };

        self.pause(self.settings.settle)?;
        Ok(distance)
    }

    fn finish(&mut self) -> Result<(), SequencerError> {
        self.pause(self.settings.final_wait)?;
        self.announcer.cue(self.settings.final_cue_hz, self.settings.final_cue);
        self.runtime.stop()?;
        self.enter(Phase::Done);
        Ok(())
    }

    /// 失败后的收尾：停止采集和投票，下发零速并关闭通信
    fn halt(&mut self) {
        if self.voting.is_running()
            && let Err(e) = self.voting.get_result()
        {
            warn!("Failed to stop voting pool: {}", e);
        }
        if self.source.is_none() {
            match self.mailbox.stop() {
                Ok(source) => self.source = Some(source),
                Err(e) => debug!("Capture not stopped: {}", e),
            }
        }

        if self.runtime.is_running() {
            self.runtime.set_target_speed(0);
            // 等到零速状态或超时，确保零速指令已经发出
            if self.runtime.wait_for_status(|s| s.is_stopped(), self.settings.stop_poll_timeout).is_err() {
                warn!("Vehicle did not report zero speed before shutdown");
            }
        }
        if let Err(e) = self.runtime.stop() {
            warn!("Failed to stop communication runtime: {}", e);
        }
    }
}
