use academy_common::board::{BoardError, TacticalBoard};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{
    sync::watch,
    task::{self, JoinHandle},
    time::{self, Duration, MissedTickBehavior},
};

/// Runs the board's recording and playback clocks.
///
/// Each clock is its own task on a fixed interval. The board refuses to play
/// while recording and the other way around, so the two never run together.
#[derive(Debug)]
pub struct BoardDriver {
    board: Arc<Mutex<TacticalBoard>>,
    tick: Duration,
    record_join: Option<JoinHandle<()>>,
    playback_join: Option<JoinHandle<()>>,
    index_tx: watch::Sender<usize>,
}

impl BoardDriver {
    pub fn new(board: TacticalBoard, tick: Duration) -> Self {
        let (index_tx, _) = watch::channel(0);
        Self {
            board: Arc::new(Mutex::new(board)),
            tick,
            record_join: None,
            playback_join: None,
            index_tx,
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn lock(&self) -> MutexGuard<'_, TacticalBoard> {
        lock_board(&self.board)
    }

    pub fn with_board<R>(&self, f: impl FnOnce(&mut TacticalBoard) -> R) -> R {
        f(&mut self.lock())
    }

    /// Follows the playback position as the clock or a scrub moves it
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.index_tx.subscribe()
    }

    pub fn toggle_recording(&mut self) -> Result<bool, BoardError> {
        let recording = self.lock().toggle_recording()?;
        if let Some(join) = self.record_join.take() {
            join.abort();
        }
        if recording {
            self.record_join = Some(task::spawn(record_loop(self.board.clone(), self.tick)));
        }
        Ok(recording)
    }

    pub fn toggle_playback(&mut self) -> Result<bool, BoardError> {
        let playing = {
            let mut board = self.lock();
            let playing = board.toggle_playback()?;
            self.index_tx.send_replace(board.playback_index());
            playing
        };
        if let Some(join) = self.playback_join.take() {
            join.abort();
        }
        if playing {
            self.playback_join = Some(task::spawn(playback_loop(
                self.board.clone(),
                self.tick,
                self.index_tx.clone(),
            )));
        }
        Ok(playing)
    }

    pub fn scrub(&self, index: usize) -> Result<(), BoardError> {
        self.lock().scrub(index)?;
        self.index_tx.send_replace(index);
        Ok(())
    }

    /// Resolves once the playback clock has run out of frames
    pub async fn playback_finished(&mut self) {
        if let Some(join) = self.playback_join.take() {
            if let Err(e) = join.await {
                if !e.is_cancelled() {
                    error!("Playback clock failed: {e}");
                }
            }
        }
    }

    /// Cancels both clocks without touching the board
    pub fn stop_clocks(&mut self) {
        for join in [self.record_join.take(), self.playback_join.take()]
            .into_iter()
            .flatten()
        {
            join.abort();
        }
    }
}

impl Drop for BoardDriver {
    fn drop(&mut self) {
        self.stop_clocks();
    }
}

fn lock_board(board: &Mutex<TacticalBoard>) -> MutexGuard<'_, TacticalBoard> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_interval(tick: Duration) -> time::Interval {
    let mut interval = time::interval_at(time::Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn record_loop(board: Arc<Mutex<TacticalBoard>>, tick: Duration) {
    debug!("Recording clock started");
    let mut interval = new_interval(tick);
    loop {
        interval.tick().await;
        if !lock_board(&board).record_tick() {
            break;
        }
    }
    debug!("Recording clock stopped");
}

async fn playback_loop(
    board: Arc<Mutex<TacticalBoard>>,
    tick: Duration,
    index_tx: watch::Sender<usize>,
) {
    debug!("Playback clock started");
    let mut interval = new_interval(tick);
    loop {
        interval.tick().await;
        let (playing, index) = {
            let mut board = lock_board(&board);
            (board.playback_tick(), board.playback_index())
        };
        index_tx.send_replace(index);
        if !playing {
            break;
        }
    }
    debug!("Playback clock stopped");
}

#[cfg(test)]
mod test {
    use super::*;
    use academy_common::{
        config::Board as BoardConfig,
        scene::{Point, TokenKind},
    };
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn initialize() {
        INIT.call_once(|| {
            let _ = env_logger::builder().is_test(true).try_init();
        });
    }

    const TICK: Duration = Duration::from_millis(50);

    fn new_driver() -> BoardDriver {
        BoardDriver::new(TacticalBoard::with_seed(BoardConfig::default(), 3), TICK)
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_frame_per_tick() {
        initialize();
        let mut driver = new_driver();
        let id = driver.with_board(|b| b.add_token(TokenKind::TeamA)).unwrap();

        assert_eq!(driver.toggle_recording(), Ok(true));
        time::sleep(TICK * 2 + TICK / 2).await;
        driver
            .with_board(|b| {
                b.start_drag(&id)?;
                b.move_drag(Point::new(80.0, 50.0))?;
                b.end_drag()
            })
            .unwrap();
        time::sleep(TICK).await;
        assert_eq!(driver.toggle_recording(), Ok(false));

        time::sleep(TICK * 4).await;
        let board = driver.lock();
        let frames = board.frames();
        assert_eq!(frames.len(), 3);
        assert_ne!(frames[0].tokens[0], frames[2].tokens[0]);
        assert_eq!(frames[2].tokens[0].x(), 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_recording_discards_frames() {
        initialize();
        let mut driver = new_driver();
        driver.toggle_recording().unwrap();
        time::sleep(TICK * 5 + TICK / 2).await;
        driver.toggle_recording().unwrap();
        assert_eq!(driver.lock().frames().len(), 5);

        driver.toggle_recording().unwrap();
        assert!(driver.lock().frames().is_empty());
        time::sleep(TICK + TICK / 2).await;
        driver.toggle_recording().unwrap();
        assert_eq!(driver.lock().frames().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_runs_out() {
        initialize();
        let mut driver = new_driver();
        driver.with_board(|b| b.add_token(TokenKind::Ball)).unwrap();
        driver.toggle_recording().unwrap();
        time::sleep(TICK * 4 + TICK / 2).await;
        driver.toggle_recording().unwrap();

        let rx = driver.subscribe();
        assert_eq!(driver.toggle_playback(), Ok(true));
        assert_eq!(*rx.borrow(), 0);
        driver.playback_finished().await;

        assert!(!driver.lock().is_playing());
        assert_eq!(driver.lock().playback_index(), 3);
        assert_eq!(*rx.borrow(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_needs_frames() {
        initialize();
        let mut driver = new_driver();
        assert_eq!(driver.toggle_playback(), Err(BoardError::NoFrames));
        assert!(!driver.lock().is_playing());
        driver.playback_finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_playback_midway() {
        initialize();
        let mut driver = new_driver();
        driver.toggle_recording().unwrap();
        time::sleep(TICK * 10 + TICK / 2).await;
        driver.toggle_recording().unwrap();

        driver.toggle_playback().unwrap();
        time::sleep(TICK * 3 + TICK / 2).await;
        assert_eq!(driver.toggle_playback(), Ok(false));
        let index = driver.lock().playback_index();
        assert_eq!(index, 3);

        time::sleep(TICK * 5).await;
        assert_eq!(driver.lock().playback_index(), index);

        driver.scrub(7).unwrap();
        assert_eq!(*driver.subscribe().borrow(), 7);
    }
}
