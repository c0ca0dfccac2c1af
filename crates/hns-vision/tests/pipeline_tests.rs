//! 采集邮箱 + 投票池联合测试

use hns_vision::mock::{PhasedSource, ScriptedPerception, signal_frame};
use hns_vision::{CaptureMailbox, Image, SignalKind, VotingConfig, VotingPool, half_frame_crop};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_workers_vote_on_captured_frames() {
    let info = |digit| signal_frame(Some(SignalKind::Info), Some(digit));
    let script = vec![
        info(2),
        signal_frame(Some(SignalKind::Start), None),
        info(4),
        info(2),
        signal_frame(None, None),
        info(2),
        info(4),
    ];
    let frames = script.len();
    let source = PhasedSource::new(vec![script], Duration::from_millis(1)).with_limit(frames);

    let mut mailbox = CaptureMailbox::new();
    let mut pool = VotingPool::new(
        VotingConfig {
            workers: 3,
            poll_timeout: Duration::from_millis(20),
            signal_kind: SignalKind::Info,
        },
        Arc::new(ScriptedPerception),
    )
    .unwrap();

    pool.run(mailbox.work_queue()).unwrap();
    mailbox
        .start(
            Box::new(source),
            Box::new(|image: &Image| half_frame_crop(image, &[SignalKind::Start, SignalKind::Info])),
        )
        .unwrap();

    let queue = mailbox.work_queue();
    let deadline = Instant::now() + Duration::from_secs(2);
    while (mailbox.frames_captured() < frames as u64 || !queue.is_empty())
        && Instant::now() < deadline
    {
        std::thread::sleep(Duration::from_millis(5));
    }
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(pool.get_result(), Ok(Some(2)));
    assert!(mailbox.stop().is_ok());
}

#[test]
fn test_consumer_sees_latest_frame_only() {
    let frames = vec![
        signal_frame(Some(SignalKind::Start), None),
        signal_frame(Some(SignalKind::Info), Some(8)),
        signal_frame(Some(SignalKind::Info), Some(9)),
    ];
    let source = PhasedSource::new(vec![frames.clone()], Duration::ZERO).with_limit(3);

    let mut mailbox = CaptureMailbox::new();
    mailbox.start(Box::new(source), Box::new(|image: &Image| image.clone())).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while mailbox.frames_captured() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(mailbox.latest(Duration::from_millis(100)), Some(frames[2].clone()));
    assert_eq!(mailbox.work_queue().len(), 3);
    assert!(mailbox.stop().is_ok());
}
