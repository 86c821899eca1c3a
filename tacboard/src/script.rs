//! Scripted board sessions.
//!
//! A script is a TOML file listing what a coach would do at the board. It
//! lets an animation be built and recorded without a pointer:
//!
//! ```toml
//! title = "Overlap on the right"
//!
//! [[steps]]
//! action = "add"
//! kind = "team-a"
//! name = "winger"
//!
//! [[steps]]
//! action = "record"
//!
//! [[steps]]
//! action = "drag"
//! token = "winger"
//! path = [[600.0, 250.0], [700.0, 150.0]]
//! ```

use crate::driver::BoardDriver;
use academy_common::{
    board::{BoardError, InteractionMode},
    scene::{Point, TokenKind},
};
use log::*;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs::read_to_string, path::Path};
use thiserror::Error;
use tokio::time;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    /// Field size in pixels that drag and stroke coordinates refer to
    pub field: Option<[f64; 2]>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Add {
        kind: TokenKind,
        name: Option<String>,
    },
    Remove {
        token: String,
    },
    Mode {
        mode: InteractionMode,
    },
    Color {
        color: String,
    },
    Drag {
        token: String,
        path: Vec<[f64; 2]>,
    },
    Stroke {
        points: Vec<[f64; 2]>,
        color: Option<String>,
    },
    Record,
    Wait {
        ticks: u32,
    },
    Clear,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read script: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Step {0}: {1}")]
    Board(usize, BoardError),
    #[error("Step {0}: no token named {1}")]
    UnknownName(usize, String),
    #[error("Step {0}: a {1} needs at least one point")]
    Empty(usize, &'static str),
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let text = read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        Ok(toml::from_str(text)?)
    }

    /// Plays the steps against the driver in real time. Every point of a drag
    /// or stroke takes one tick so a running recording captures the motion.
    /// Recording is stopped at the end if a step left it running.
    pub async fn run(&self, driver: &mut BoardDriver) -> Result<usize, ScriptError> {
        let tick = driver.tick();
        let mut names: HashMap<String, String> = HashMap::new();

        if let Some([width, height]) = self.field {
            driver.with_board(|b| b.set_field_size(width, height));
        }

        for (n, step) in self.steps.iter().enumerate() {
            let board_err = |e: BoardError| ScriptError::Board(n, e);
            debug!("Script step {n}: {step:?}");
            match step {
                Step::Add { kind, name } => {
                    let id = driver
                        .with_board(|b| b.add_token(*kind))
                        .map_err(board_err)?;
                    if let Some(name) = name {
                        names.insert(name.clone(), id);
                    }
                }
                Step::Remove { token } => {
                    let id = resolve(&names, token);
                    driver
                        .with_board(|b| b.remove_token(&id))
                        .map_err(board_err)?;
                }
                Step::Mode { mode } => {
                    driver.with_board(|b| b.set_mode(*mode)).map_err(board_err)?;
                }
                Step::Color { color } => {
                    driver.with_board(|b| b.set_pen_color(color));
                }
                Step::Drag { token, path } => {
                    if path.is_empty() {
                        return Err(ScriptError::Empty(n, "drag"));
                    }
                    let id = resolve(&names, token);
                    driver
                        .with_board(|b| {
                            b.set_mode(InteractionMode::Move)?;
                            b.start_drag(&id)
                        })
                        .map_err(|e| match e {
                            BoardError::UnknownToken(_) => {
                                ScriptError::UnknownName(n, token.clone())
                            }
                            e => ScriptError::Board(n, e),
                        })?;
                    for [x, y] in path {
                        driver
                            .with_board(|b| b.move_drag(Point::new(*x, *y)))
                            .map_err(board_err)?;
                        time::sleep(tick).await;
                    }
                    driver.with_board(|b| b.end_drag()).map_err(board_err)?;
                }
                Step::Stroke { points, color } => {
                    let Some(([x, y], rest)) = points.split_first() else {
                        return Err(ScriptError::Empty(n, "stroke"));
                    };
                    driver
                        .with_board(|b| {
                            b.set_mode(InteractionMode::Draw)?;
                            if let Some(color) = color {
                                b.set_pen_color(color);
                            }
                            b.start_stroke(Point::new(*x, *y))
                        })
                        .map_err(board_err)?;
                    for [x, y] in rest {
                        time::sleep(tick).await;
                        driver
                            .with_board(|b| b.append_stroke_point(Point::new(*x, *y)))
                            .map_err(board_err)?;
                    }
                    driver
                        .with_board(|b| b.commit_stroke())
                        .map_err(board_err)?;
                }
                Step::Record => {
                    driver.toggle_recording().map_err(board_err)?;
                }
                Step::Wait { ticks } => {
                    time::sleep(tick * *ticks).await;
                }
                Step::Clear => {
                    driver.with_board(|b| b.clear()).map_err(board_err)?;
                }
            }
        }

        if driver.lock().is_recording() {
            info!("Script ended while recording, stopping the recording");
            driver
                .toggle_recording()
                .map_err(|e| ScriptError::Board(self.steps.len(), e))?;
        }

        Ok(driver.lock().frames().len())
    }
}

fn resolve(names: &HashMap<String, String>, token: &str) -> String {
    names
        .get(token)
        .cloned()
        .unwrap_or_else(|| token.to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use academy_common::{board::TacticalBoard, config::Board as BoardConfig};
    use indoc::indoc;
    use tokio::time::Duration;

    const SCRIPT: &str = indoc!(
        r##"title = "Overlap"
            category_id = "u12"
            field = [1000.0, 500.0]

            [[steps]]
            action = "add"
            kind = "team-a"
            name = "winger"

            [[steps]]
            action = "add"
            kind = "ball"

            [[steps]]
            action = "record"

            [[steps]]
            action = "drag"
            token = "winger"
            path = [[600.0, 250.0], [700.0, 150.0], [2000.0, -40.0]]

            [[steps]]
            action = "stroke"
            color = "#ffcc00"
            points = [[10.0, 10.0], [20.0, 20.0]]

            [[steps]]
            action = "color"
            color = "#00ff00"

            [[steps]]
            action = "mode"
            mode = "move"

            [[steps]]
            action = "wait"
            ticks = 2
        "##
    );

    fn new_driver() -> BoardDriver {
        BoardDriver::new(
            TacticalBoard::with_seed(BoardConfig::default(), 11),
            Duration::from_millis(50),
        )
    }

    #[test]
    fn test_parse_script() {
        let script = Script::parse(SCRIPT).unwrap();
        assert_eq!(script.title, "Overlap");
        assert_eq!(script.category_id.as_deref(), Some("u12"));
        assert_eq!(script.steps.len(), 8);
        assert_eq!(
            script.steps[0],
            Step::Add {
                kind: TokenKind::TeamA,
                name: Some("winger".to_string())
            }
        );
        assert_eq!(
            script.steps[6],
            Step::Mode {
                mode: InteractionMode::Move
            }
        );
        assert_eq!(script.steps[7], Step::Wait { ticks: 2 });
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let text = "title = \"x\"\n[[steps]]\naction = \"teleport\"\n";
        assert!(matches!(Script::parse(text), Err(ScriptError::Parse(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_script_records() {
        let script = Script::parse(SCRIPT).unwrap();
        let mut driver = new_driver();
        let frames = script.run(&mut driver).await.unwrap();

        let board = driver.lock();
        assert!(!board.is_recording());
        assert_eq!(board.frames().len(), frames);
        assert!(frames >= 5);
        assert_eq!(board.field_size(), (1000.0, 500.0));

        let winger = board
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::TeamA)
            .unwrap();
        assert_eq!((winger.x(), winger.y()), (100.0, 0.0));
        assert_eq!(board.strokes().len(), 1);
        assert_eq!(board.strokes()[0].color, "#ffcc00");
        assert_eq!(board.pen_color(), "#00ff00");
        assert_eq!(board.mode(), InteractionMode::Move);
        assert!(board.tokens().iter().all(|t| (0.0..=100.0).contains(&t.x())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_token_name() {
        let script = Script::parse(indoc!(
            r#"title = "Bad"
               [[steps]]
               action = "drag"
               token = "striker"
               path = [[1.0, 1.0]]
            "#
        ))
        .unwrap();
        let mut driver = new_driver();
        let result = script.run(&mut driver).await;
        assert!(matches!(result, Err(ScriptError::UnknownName(0, name)) if name == "striker"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_stroke() {
        let script = Script {
            title: "Empty".to_string(),
            description: None,
            category_id: None,
            field: None,
            steps: vec![Step::Stroke {
                points: vec![],
                color: None,
            }],
        };
        let mut driver = new_driver();
        assert!(matches!(
            script.run(&mut driver).await,
            Err(ScriptError::Empty(0, "stroke"))
        ));
    }
}
