use crate::{
    bundles::SideBundle,
    config::Board as BoardConfig,
    field_support::{FIELD_CENTER_PERCENT, FIELD_MAX_PERCENT},
    scene::{Frame, InitialState, Point, Stroke, Token, TokenKind},
};
use derivative::Derivative;
use log::*;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[derivative(Default)]
    Move,
    Draw,
}

impl InteractionMode {
    pub fn other(self) -> Self {
        match self {
            Self::Move => Self::Draw,
            Self::Draw => Self::Move,
        }
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move => write!(f, "Move"),
            Self::Draw => write!(f, "Draw"),
        }
    }
}

/// Editable 2D scene that can be recorded as a frame animation and replayed.
///
/// The board never keeps time itself. Whoever owns it calls
/// [`TacticalBoard::record_tick`] and [`TacticalBoard::playback_tick`] on a
/// fixed cadence.
#[derive(Debug)]
pub struct TacticalBoard {
    config: BoardConfig,
    tokens: Vec<Token>,
    strokes: Vec<Stroke>,
    current_stroke: Option<Stroke>,
    mode: InteractionMode,
    pen_color: String,
    dragging: Option<String>,
    recording: bool,
    playing: bool,
    frames: Vec<Frame>,
    playback_index: usize,
    labels: SideBundle<u16>,
    next_id: u64,
    rng: StdRng,
}

impl TacticalBoard {
    pub fn new(config: BoardConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: BoardConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: BoardConfig, rng: StdRng) -> Self {
        Self {
            tokens: vec![],
            strokes: vec![],
            current_stroke: None,
            mode: InteractionMode::Move,
            pen_color: config.pen_color.clone(),
            dragging: None,
            recording: false,
            playing: false,
            frames: vec![],
            playback_index: 0,
            labels: Default::default(),
            next_id: 1,
            rng,
            config,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, id: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn current_stroke(&self) -> Option<&Stroke> {
        self.current_stroke.as_ref()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn pen_color(&self) -> &str {
        &self.pen_color
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn playback_index(&self) -> usize {
        self.playback_index
    }

    pub fn field_size(&self) -> (f64, f64) {
        (self.config.field_width, self.config.field_height)
    }

    /// Non-positive or non-finite sizes are ignored
    pub fn set_field_size(&mut self, width: f64, height: f64) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            debug!("Field resized to {width}x{height}");
            self.config.field_width = width;
            self.config.field_height = height;
        } else {
            warn!("Ignoring invalid field size {width}x{height}");
        }
    }

    pub fn set_pen_color(&mut self, color: &str) {
        self.pen_color = color.to_string();
    }

    pub fn set_mode(&mut self, mode: InteractionMode) -> Result<()> {
        self.ensure_not_playing()?;
        if mode == self.mode {
            return Ok(());
        }
        match self.mode {
            InteractionMode::Move => self.dragging = None,
            InteractionMode::Draw => self.finish_current_stroke(),
        }
        info!("{} Mode set to {mode}", self.status_string());
        self.mode = mode;
        Ok(())
    }

    pub fn toggle_mode(&mut self) -> Result<InteractionMode> {
        self.set_mode(self.mode.other())?;
        Ok(self.mode)
    }

    /// Places a new token near the middle of the field, returning its id
    pub fn add_token(&mut self, kind: TokenKind) -> Result<String> {
        self.ensure_not_playing()?;

        let jitter = if self.config.spawn_jitter.is_finite() {
            self.config.spawn_jitter.abs().min(FIELD_CENTER_PERCENT)
        } else {
            0.0
        };
        let x = FIELD_CENTER_PERCENT + self.rng.random_range(-jitter..=jitter);
        let y = FIELD_CENTER_PERCENT + self.rng.random_range(-jitter..=jitter);

        let label = match (kind.side(), kind.fixed_label()) {
            (Some(side), _) => {
                self.labels[side] = self.labels[side].saturating_add(1);
                self.labels[side].to_string()
            }
            (None, Some(label)) => label.to_string(),
            (None, None) => String::new(),
        };

        let id = self.fresh_id();
        info!(
            "{} Adding {kind} token {id} at ({x:.1}%, {y:.1}%)",
            self.status_string()
        );
        self.tokens.push(Token::new(id.clone(), kind, label, x, y));
        Ok(id)
    }

    pub fn remove_token(&mut self, id: &str) -> Result<Token> {
        self.ensure_not_playing()?;
        let index = self
            .tokens
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| BoardError::UnknownToken(id.to_string()))?;
        if self.dragging.as_deref() == Some(id) {
            self.dragging = None;
        }
        info!("{} Removing token {id}", self.status_string());
        Ok(self.tokens.remove(index))
    }

    /// Wipes tokens and drawings but keeps any recorded animation
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_not_playing()?;
        info!("{} Clearing the board", self.status_string());
        self.tokens.clear();
        self.strokes.clear();
        self.current_stroke = None;
        self.dragging = None;
        self.labels = Default::default();
        Ok(())
    }

    pub fn start_drag(&mut self, id: &str) -> Result<()> {
        self.ensure_not_playing()?;
        self.ensure_mode(InteractionMode::Move)?;
        if self.token(id).is_none() {
            return Err(BoardError::UnknownToken(id.to_string()));
        }
        debug!("Start dragging {id}");
        self.dragging = Some(id.to_string());
        Ok(())
    }

    /// `point` is in pixels relative to the field's top-left corner. Does
    /// nothing when no drag is in progress.
    pub fn move_drag(&mut self, point: Point) -> Result<()> {
        self.ensure_not_playing()?;
        let Some(id) = self.dragging.as_deref() else {
            return Ok(());
        };
        let (width, height) = self.field_size();
        let x = point.x / width * FIELD_MAX_PERCENT;
        let y = point.y / height * FIELD_MAX_PERCENT;
        if let Some(token) = self.tokens.iter_mut().find(|t| t.id == id) {
            token.set_position(x, y);
            trace!("Dragged {id} to ({:.1}%, {:.1}%)", token.x(), token.y());
        }
        Ok(())
    }

    pub fn end_drag(&mut self) -> Result<()> {
        self.ensure_not_playing()?;
        match self.dragging.take() {
            Some(id) => {
                debug!("End dragging {id}");
                Ok(())
            }
            None => Err(BoardError::NoDrag),
        }
    }

    pub fn start_stroke(&mut self, point: Point) -> Result<()> {
        self.ensure_not_playing()?;
        self.ensure_mode(InteractionMode::Draw)?;
        self.finish_current_stroke();
        debug!("Starting stroke at ({}, {})", point.x, point.y);
        self.current_stroke = Some(Stroke::new(self.pen_color.clone(), point));
        Ok(())
    }

    pub fn append_stroke_point(&mut self, point: Point) -> Result<()> {
        self.ensure_not_playing()?;
        match self.current_stroke.as_mut() {
            Some(stroke) => {
                stroke.points.push(point);
                Ok(())
            }
            None => Err(BoardError::NoStroke),
        }
    }

    /// Moves the in-progress stroke into the committed list. Returns `false`
    /// if there was nothing worth keeping.
    pub fn commit_stroke(&mut self) -> Result<bool> {
        self.ensure_not_playing()?;
        match self.current_stroke.take() {
            Some(stroke) if !stroke.is_empty() => {
                debug!("Committing stroke of {} points", stroke.points.len());
                self.strokes.push(stroke);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(BoardError::NoStroke),
        }
    }

    fn finish_current_stroke(&mut self) {
        if let Some(stroke) = self.current_stroke.take() {
            if !stroke.is_empty() {
                self.strokes.push(stroke);
            }
        }
    }

    /// Starting always throws away the previous animation. Returns whether
    /// the board is now recording.
    pub fn toggle_recording(&mut self) -> Result<bool> {
        self.ensure_not_playing()?;
        if self.recording {
            self.recording = false;
            info!(
                "{} Recording stopped with {} frames",
                self.status_string(),
                self.frames.len()
            );
        } else {
            self.frames.clear();
            self.playback_index = 0;
            self.recording = true;
            info!("{} Recording started", self.status_string());
        }
        Ok(self.recording)
    }

    /// Appends one frame while recording. Returns whether a frame was taken.
    pub fn record_tick(&mut self) -> bool {
        if !self.recording {
            return false;
        }
        let frame = self.snapshot();
        self.frames.push(frame);
        trace!("Captured frame {}", self.frames.len() - 1);
        true
    }

    /// Returns whether the board is now playing
    pub fn toggle_playback(&mut self) -> Result<bool> {
        if self.playing {
            self.playing = false;
            info!(
                "{} Playback stopped at frame {}",
                self.status_string(),
                self.playback_index
            );
            return Ok(false);
        }
        if self.recording {
            return Err(BoardError::Recording);
        }
        if self.frames.is_empty() {
            return Err(BoardError::NoFrames);
        }

        self.dragging = None;
        self.playing = true;
        self.apply_frame(0);
        info!(
            "{} Playback started over {} frames",
            self.status_string(),
            self.frames.len()
        );
        Ok(true)
    }

    /// Advances playback by one frame. Returns whether playback continues.
    pub fn playback_tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        let next = self.playback_index + 1;
        if next >= self.frames.len() {
            self.playing = false;
            info!("{} Playback finished", self.status_string());
            return false;
        }

        self.apply_frame(next);
        if next == self.frames.len() - 1 {
            self.playing = false;
            info!("{} Playback reached the last frame", self.status_string());
        }
        self.playing
    }

    pub fn scrub(&mut self, index: usize) -> Result<()> {
        if self.recording {
            return Err(BoardError::Recording);
        }
        if index >= self.frames.len() {
            return Err(BoardError::InvalidFrameIndex(index, self.frames.len()));
        }
        debug!("Scrubbing to frame {index}");
        self.dragging = None;
        self.apply_frame(index);
        Ok(())
    }

    fn apply_frame(&mut self, index: usize) {
        let frame = &self.frames[index];
        self.tokens = frame.tokens.clone();
        self.strokes = frame.strokes.clone();
        self.current_stroke = frame.current_stroke.clone();
        self.playback_index = index;
    }

    /// A deep copy of the live scene
    pub fn snapshot(&self) -> Frame {
        Frame {
            tokens: self.tokens.clone(),
            strokes: self.strokes.clone(),
            current_stroke: self.current_stroke.clone(),
        }
    }

    pub fn initial_state(&self) -> InitialState {
        InitialState {
            tokens: self.tokens.clone(),
            strokes: self.strokes.clone(),
        }
    }

    pub fn animation(&self) -> &[Frame] {
        &self.frames
    }

    /// Replaces everything on the board with a saved scene and animation
    pub fn load(&mut self, initial: InitialState, animation: Vec<Frame>) {
        self.tokens = initial.tokens.into_iter().map(Token::clamped).collect();
        self.strokes = initial.strokes;
        self.current_stroke = None;
        self.frames = animation
            .into_iter()
            .map(|frame| Frame {
                tokens: frame.tokens.into_iter().map(Token::clamped).collect(),
                ..frame
            })
            .collect();
        self.playback_index = 0;
        self.playing = false;
        self.recording = false;
        self.dragging = None;
        self.labels = self
            .tokens
            .iter()
            .filter_map(|t| Some((t.kind.side()?, t.label.parse::<u16>().ok()?)))
            .fold(SideBundle::default(), |mut highest, (side, number)| {
                highest[side] = highest[side].max(number);
                highest
            });
        info!(
            "{} Loaded {} tokens, {} strokes and {} frames",
            self.status_string(),
            self.tokens.len(),
            self.strokes.len(),
            self.frames.len()
        );
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id = format!("tok-{}", self.next_id);
            self.next_id += 1;
            if self.token(&id).is_none() {
                return id;
            }
        }
    }

    fn ensure_not_playing(&self) -> Result<()> {
        if self.playing {
            Err(BoardError::Playing)
        } else {
            Ok(())
        }
    }

    fn ensure_mode(&self, mode: InteractionMode) -> Result<()> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(BoardError::WrongMode(mode))
        }
    }

    fn status_string(&self) -> String {
        let activity = if self.recording {
            format!("REC {}", self.frames.len())
        } else if self.playing {
            format!("PLAY {}/{}", self.playback_index + 1, self.frames.len())
        } else {
            "IDLE".to_string()
        };
        format!("[{activity} {} {}t]", self.mode, self.tokens.len())
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Can't edit the board while an animation is playing")]
    Playing,
    #[error("Can't do that while recording")]
    Recording,
    #[error("There are no recorded frames")]
    NoFrames,
    #[error("Action only available in {0} mode")]
    WrongMode(InteractionMode),
    #[error("No token with id {0}")]
    UnknownToken(String),
    #[error("No token is being dragged")]
    NoDrag,
    #[error("No stroke is being drawn")]
    NoStroke,
    #[error("Frame {0} is out of range, the animation has {1} frames")]
    InvalidFrameIndex(usize, usize),
}

pub type Result<T> = std::result::Result<T, BoardError>;
