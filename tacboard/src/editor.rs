use crate::{
    alerts::{AlertCenter, AlertKind},
    driver::BoardDriver,
};
use academy_common::{
    board::BoardError,
    portal::{
        AcademyPortalClient, PortalError,
        boards::{TacticalBoardInput, TacticalBoardSummary},
    },
    scene::{Frame, InitialState},
};
use log::*;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;
use tokio::time::Instant;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardMeta {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
}

impl From<&TacticalBoardSummary> for BoardMeta {
    fn from(summary: &TacticalBoardSummary) -> Self {
        Self {
            title: summary.title.clone(),
            description: summary.description.clone(),
            category_id: summary.category_id.clone(),
        }
    }
}

/// A board saved to disk, same shape as the portal's record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardFile {
    #[serde(flatten)]
    pub meta: BoardMeta,
    #[serde(default)]
    pub initial_state: InitialState,
    #[serde(default)]
    pub animation: Vec<Frame>,
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Not connected to the academy portal")]
    NoClient,
    #[error("This board hasn't been saved yet")]
    NoBoard,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("Board file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Board file is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

/// Ties the live board to its saved copy on the portal.
///
/// Every outcome is reported to the alert center. Failed calls aren't retried
/// and never change the board.
#[derive(Debug)]
pub struct BoardEditor {
    driver: BoardDriver,
    client: Option<AcademyPortalClient>,
    alerts: AlertCenter,
    board_id: Option<String>,
}

impl BoardEditor {
    pub fn new(
        driver: BoardDriver,
        client: Option<AcademyPortalClient>,
        alerts: AlertCenter,
    ) -> Self {
        Self {
            driver,
            client,
            alerts,
            board_id: None,
        }
    }

    pub fn driver(&self) -> &BoardDriver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut BoardDriver {
        &mut self.driver
    }

    pub fn alerts(&mut self) -> &mut AlertCenter {
        &mut self.alerts
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    pub fn client(&mut self) -> Result<&AcademyPortalClient> {
        if self.client.is_none() {
            return Err(self.report(EditorError::NoClient));
        }
        self.client.as_ref().ok_or(EditorError::NoClient)
    }

    /// Creates the board on first save, updates it afterwards
    pub async fn save(&mut self, meta: &BoardMeta) -> Result<TacticalBoardSummary> {
        if meta.title.trim().is_empty() {
            return Err(self.report(EditorError::Validation(
                "A board needs a title before it can be saved".to_string(),
            )));
        }
        let Some(client) = self.client.as_ref() else {
            return Err(self.report(EditorError::NoClient));
        };

        let input = {
            let board = self.driver.lock();
            TacticalBoardInput {
                title: meta.title.trim().to_string(),
                description: meta.description.clone(),
                category_id: meta.category_id.clone(),
                initial_state: board.initial_state(),
                animation: board.animation().to_vec(),
            }
        };
        self.alerts
            .push(AlertKind::Loading, "Saving board", Instant::now());
        let result = match self.board_id.as_deref() {
            Some(id) => client.update_tactical_board(id, &input).await,
            None => client.create_tactical_board(&input).await,
        };

        match result {
            Ok(summary) => {
                self.board_id = Some(summary.id.clone());
                self.alerts.push(
                    AlertKind::Success,
                    format!("Saved \"{}\"", summary.title),
                    Instant::now(),
                );
                Ok(summary)
            }
            Err(e) => Err(self.report(e.into())),
        }
    }

    /// Replaces everything on the board with the saved copy
    pub async fn load(&mut self, id: &str) -> Result<TacticalBoardSummary> {
        if id.trim().is_empty() {
            return Err(self.report(EditorError::Validation("No board id given".to_string())));
        }
        let Some(client) = self.client.as_ref() else {
            return Err(self.report(EditorError::NoClient));
        };
        let request = client.tactical_board(id);
        self.alerts
            .push(AlertKind::Loading, "Loading board", Instant::now());

        match request.await {
            Ok(record) => {
                self.driver.stop_clocks();
                self.driver
                    .with_board(|b| b.load(record.initial_state, record.animation));
                self.board_id = Some(record.summary.id.clone());
                self.alerts.push(
                    AlertKind::Success,
                    format!("Loaded \"{}\"", record.summary.title),
                    Instant::now(),
                );
                Ok(record.summary)
            }
            Err(e) => Err(self.report(e.into())),
        }
    }

    pub async fn delete(&mut self) -> Result<()> {
        let Some(id) = self.board_id.clone() else {
            return Err(self.report(EditorError::NoBoard));
        };
        let Some(client) = self.client.as_ref() else {
            return Err(self.report(EditorError::NoClient));
        };

        let result = client.delete_tactical_board(&id).await.and_then(|deleted| {
            if deleted {
                Ok(())
            } else {
                Err(PortalError::NotFound(format!("Tactical board {id}")))
            }
        });

        match result {
            Ok(()) => {
                info!("Deleted board {id}");
                self.board_id = None;
                self.alerts
                    .push(AlertKind::Success, "Board deleted", Instant::now());
                Ok(())
            }
            Err(e) => Err(self.report(e.into())),
        }
    }

    pub fn export(&self, meta: &BoardMeta) -> BoardFile {
        let board = self.driver.lock();
        BoardFile {
            meta: meta.clone(),
            initial_state: board.initial_state(),
            animation: board.animation().to_vec(),
        }
    }

    pub fn export_to<P: AsRef<Path>>(&mut self, meta: &BoardMeta, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = self.export(meta);
        let written = serde_json::to_string_pretty(&file)
            .map_err(EditorError::from)
            .and_then(|text| fs::write(path, text).map_err(EditorError::from));
        match written {
            Ok(()) => {
                self.alerts.push(
                    AlertKind::Success,
                    format!("Exported to {}", path.display()),
                    Instant::now(),
                );
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Loads a board file locally. The board is treated as unsaved.
    pub fn import(&mut self, file: BoardFile) -> BoardMeta {
        self.driver.stop_clocks();
        self.driver
            .with_board(|b| b.load(file.initial_state, file.animation));
        self.board_id = None;
        self.alerts.push(
            AlertKind::Info,
            format!("Imported \"{}\"", file.meta.title),
            Instant::now(),
        );
        file.meta
    }

    pub fn import_from<P: AsRef<Path>>(&mut self, path: P) -> Result<BoardMeta> {
        let parsed = fs::read_to_string(path)
            .map_err(EditorError::from)
            .and_then(|text| serde_json::from_str::<BoardFile>(&text).map_err(EditorError::from));
        match parsed {
            Ok(file) => Ok(self.import(file)),
            Err(e) => Err(self.report(e)),
        }
    }

    /// Shows an error as an alert and hands it back for propagation
    pub fn report(&mut self, error: EditorError) -> EditorError {
        let kind = match error {
            EditorError::Validation(_) | EditorError::NoBoard => AlertKind::Validation,
            _ => AlertKind::Error,
        };
        self.alerts.push(kind, error.to_string(), Instant::now());
        error
    }
}
