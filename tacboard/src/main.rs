use academy_common::{
    attendance::{AttendanceSheet, AttendanceStatus},
    board::TacticalBoard,
    config::Config,
    portal::AcademyPortalClient,
};
use clap::{Parser, Subcommand};
use log::*;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            RollingFileAppender,
            policy::compound::{
                CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
            },
        },
    },
    config::{Appender, Config as LogConfig, Logger, Root},
    encode::pattern::PatternEncoder,
};
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;
use time::macros::format_description;
use tokio::time::Instant;

mod alerts;
mod driver;
mod editor;
mod render;
mod script;

use alerts::{AlertCenter, AlertKind};
use driver::BoardDriver;
use editor::{BoardEditor, BoardMeta, EditorError};
use script::Script;

const APP_NAME: &str = "tacboard";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(long, short, action(clap::ArgAction::Count))]
    /// Increase the log verbosity
    verbose: u8,

    #[clap(long)]
    /// Read settings from this TOML file instead of the stored config
    config: Option<PathBuf>,

    #[clap(long)]
    /// Don't require HTTPS to connect to the academy portal
    allow_http: bool,

    #[clap(long)]
    /// Directory within which log files will be placed, default is platform dependent
    log_location: Option<PathBuf>,

    #[clap(long, default_value = "5000000")]
    /// Max size in bytes that a log file is allowed to reach before being rolled over
    log_max_file_size: u64,

    #[clap(long, default_value = "3")]
    /// Number of archived logs to keep
    num_old_logs: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List saved tactical boards
    List {
        #[clap(long)]
        category: Option<String>,
    },
    /// Print a saved board
    Show {
        id: String,
        #[clap(long)]
        /// Show this animation frame instead of the opening scene
        frame: Option<usize>,
    },
    /// Play a board's animation in the terminal
    Play {
        /// Board id on the portal
        id: Option<String>,
        #[clap(long, conflicts_with = "id")]
        /// Play a board file instead
        file: Option<PathBuf>,
    },
    /// Run a board script and record what it does
    Record {
        script: PathBuf,
        #[clap(long)]
        /// Save the result to the portal
        save: bool,
        #[clap(long)]
        /// Write the result to a board file
        out: Option<PathBuf>,
    },
    /// Download a board to a file
    Export { id: String, path: PathBuf },
    /// Upload a board file as a new board
    Import { path: PathBuf },
    /// Delete a saved board
    Delete { id: String },
    /// List the academy's categories
    Categories,
    /// List players
    Players {
        #[clap(long)]
        category: Option<String>,
    },
    /// List training sessions
    Sessions {
        #[clap(long)]
        category: Option<String>,
    },
    /// List matches and results
    Matches {
        #[clap(long)]
        category: Option<String>,
    },
    /// Show notices for the signed in user
    Notices {
        #[clap(long)]
        /// Include notices meant for other roles
        all: bool,
    },
    /// Show and mark attendance for a session
    Attendance {
        session: String,
        #[clap(long = "mark", value_name = "PLAYER=STATUS")]
        marks: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let log_base_path = match args.log_location.clone() {
        Some(path) => path,
        None => {
            let mut path = directories::BaseDirs::new()
                .ok_or("Could not find a directory to store logs")?
                .data_local_dir()
                .to_path_buf();
            path.push("tacboard-logs");
            path
        }
    };
    let log_path = log_base_path.join(format!("{APP_NAME}-log.txt"));
    let archived_log_path = log_base_path.join(format!("{APP_NAME}-log-{{}}.txt.gz"));

    #[cfg(not(target_os = "windows"))]
    let console_target = Target::Stderr;
    #[cfg(target_os = "windows")]
    let console_target = Target::Stdout; // Windows apps don't get a stderr handle
    let console = ConsoleAppender::builder()
        .target(console_target)
        .encoder(Box::new(PatternEncoder::new("[{d} {h({l:5})} {M}] {m}{n}")))
        .build();

    // Setup the file log roller
    let roller = FixedWindowRoller::builder().build(
        archived_log_path
            .to_str()
            .ok_or("Log path is not valid unicode")?,
        args.num_old_logs,
    )?;
    let file_policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(args.log_max_file_size)),
        Box::new(roller),
    );
    let file_appender = RollingFileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new("[{d} {l:5} {M}] {m}{n}")))
        .build(&log_path, Box::new(file_policy))?;

    // Setup the logging from all locations to use `LevelFilter::Error`
    let root = Root::builder()
        .appender("file_appender")
        .appender("console")
        .build(LevelFilter::Error);

    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("file_appender", Box::new(file_appender)))
        .appender(Appender::builder().build("console", Box::new(console)))
        .logger(Logger::builder().build(APP_NAME, log_level))
        .logger(Logger::builder().build("academy_common", log_level))
        .build(root)?;

    log4rs::init_config(log_config)?;
    log_panics::init();
    debug!("Logging to {}", log_path.display());

    let mut config = load_config(args.config.as_ref())?;
    if let Ok(token) = std::env::var("ACADEMY_TOKEN") {
        debug!("Using access token from ACADEMY_TOKEN");
        config.portal.access_token = token;
    }

    let client = match AcademyPortalClient::new(
        &config.portal.url,
        config.portal.token(),
        config.portal.require_https && !args.allow_http,
        config.portal.timeout(),
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Couldn't set up the academy portal client: {e}");
            None
        }
    };

    let board = TacticalBoard::new(config.board.clone());
    let driver = BoardDriver::new(board, config.board.tick_interval());
    let alerts = AlertCenter::new(config.board.alert_duration());
    let mut editor = BoardEditor::new(driver, client, alerts);

    let result = run(&mut editor, args.command).await;
    flush_alerts(editor.alerts());
    Ok(result?)
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        info!("Reading config file from {}", path.display());
        return Ok(Config::new_from_file(path)?);
    }

    match confy::get_configuration_file_path(APP_NAME, None) {
        Ok(path) => info!("Reading config file from {}", path.display()),
        Err(e) => warn!("Couldn't locate the config file: {e}"),
    }
    let config = match confy::load(APP_NAME, None) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file, overwriting with default. Error: {e}");
            let config = Config::default();
            if let Err(e) = confy::store(APP_NAME, None, &config) {
                error!("Failed to store the default config: {e}");
            }
            config
        }
    };
    Ok(config)
}

fn flush_alerts(alerts: &mut AlertCenter) {
    for alert in alerts.active(Instant::now()) {
        eprintln!("{alert}");
    }
    alerts.dismiss_all();
}

async fn run(editor: &mut BoardEditor, command: Command) -> Result<(), EditorError> {
    match command {
        Command::List { category } => {
            let boards = editor
                .client()?
                .tactical_boards(category.as_deref())
                .await
                .map_err(|e| editor.report(e.into()))?;
            let mut table = new_table(&["ID", "Title", "Category", "Updated"]);
            for board in boards {
                let updated = board
                    .updated_at
                    .and_then(|t| {
                        t.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                            .ok()
                    })
                    .unwrap_or_default();
                table.add_row(cells(&[
                    &board.id,
                    &board.title,
                    board.category_id.as_deref().unwrap_or("-"),
                    &updated,
                ]));
            }
            table.printstd();
        }
        Command::Show { id, frame } => {
            let summary = editor.load(&id).await?;
            if let Some(index) = frame {
                editor
                    .driver()
                    .scrub(index)
                    .map_err(|e| editor.report(e.into()))?;
            }
            println!("{}", summary.title);
            if let Some(description) = &summary.description {
                println!("{description}");
            }
            print_board(editor);
        }
        Command::Play { id, file } => {
            match (id, file) {
                (Some(id), _) => {
                    editor.load(&id).await?;
                }
                (None, Some(file)) => {
                    editor.import_from(file)?;
                }
                (None, None) => {
                    return Err(editor.report(EditorError::Validation(
                        "Give a board id or a --file to play".to_string(),
                    )));
                }
            }
            play(editor).await?;
        }
        Command::Record { script, save, out } => {
            let script = Script::from_file(&script).map_err(|e| {
                editor.report(EditorError::Validation(e.to_string()))
            })?;
            let meta = BoardMeta {
                title: script.title.clone(),
                description: script.description.clone(),
                category_id: script.category_id.clone(),
            };
            let frames = script
                .run(editor.driver_mut())
                .await
                .map_err(|e| editor.report(EditorError::Validation(e.to_string())))?;
            editor
                .alerts()
                .push(AlertKind::Info, format!("Recorded {frames} frames"), Instant::now());
            print_board(editor);
            if let Some(path) = out {
                editor.export_to(&meta, path)?;
            }
            if save {
                editor.save(&meta).await?;
                if let Some(id) = editor.board_id() {
                    println!("Saved as {id}");
                }
            }
        }
        Command::Export { id, path } => {
            let summary = editor.load(&id).await?;
            editor.export_to(&(&summary).into(), path)?;
        }
        Command::Import { path } => {
            let meta = editor.import_from(path)?;
            editor.save(&meta).await?;
            if let Some(id) = editor.board_id() {
                println!("Saved as {id}");
            }
        }
        Command::Delete { id } => {
            editor.load(&id).await?;
            editor.delete().await?;
        }
        Command::Categories => {
            let categories = editor
                .client()?
                .categories()
                .await
                .map_err(|e| editor.report(e.into()))?;
            let mut table = new_table(&["ID", "Name", "Age group", "Coaches"]);
            for category in categories {
                let coaches = category
                    .coaches
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(cells(&[
                    &category.id,
                    &category.name,
                    category.age_group.as_deref().unwrap_or("-"),
                    &coaches,
                ]));
            }
            table.printstd();
        }
        Command::Players { category } => {
            let players = editor
                .client()?
                .players(category.as_deref())
                .await
                .map_err(|e| editor.report(e.into()))?;
            let mut table = new_table(&["ID", "#", "Name", "Guardian"]);
            for player in players {
                let number = player
                    .jersey_number
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                let guardian = player
                    .guardian
                    .as_ref()
                    .map(|g| g.name.clone())
                    .unwrap_or_default();
                table.add_row(cells(&[&player.id, &number, &player.full_name(), &guardian]));
            }
            table.printstd();
        }
        Command::Sessions { category } => {
            let sessions = editor
                .client()?
                .sessions(category.as_deref())
                .await
                .map_err(|e| editor.report(e.into()))?;
            let mut table = new_table(&["ID", "Starts", "Location", "Topic"]);
            for session in sessions {
                let starts = session
                    .starts_at
                    .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                    .unwrap_or_default();
                table.add_row(cells(&[
                    &session.id,
                    &starts,
                    session.location.as_deref().unwrap_or("-"),
                    session.topic.as_deref().unwrap_or("-"),
                ]));
            }
            table.printstd();
        }
        Command::Matches { category } => {
            let matches = editor
                .client()?
                .matches(category.as_deref())
                .await
                .map_err(|e| editor.report(e.into()))?;
            let mut table = new_table(&["ID", "Date", "Opponent", "Venue", "Result"]);
            for game in matches {
                let date = game
                    .starts_at
                    .format(format_description!("[year]-[month]-[day]"))
                    .unwrap_or_default();
                let result = match (game.goals_for, game.goals_against) {
                    (Some(ours), Some(theirs)) => format!("{ours}-{theirs}"),
                    _ => "-".to_string(),
                };
                let venue = if game.is_home { "Home" } else { "Away" };
                table.add_row(cells(&[&game.id, &date, &game.opponent, venue, &result]));
            }
            table.printstd();
        }
        Command::Notices { all } => {
            let client = editor.client()?;
            let me = client.me();
            let notices = client.notices();
            let me = me.await.map_err(|e| editor.report(e.into()))?;
            let notices = notices.await.map_err(|e| editor.report(e.into()))?;
            info!("Signed in as {} ({})", me.name, me.role);
            for notice in notices.iter().filter(|n| all || n.is_for(me.role)) {
                let published = notice
                    .published_at
                    .format(format_description!("[year]-[month]-[day]"))
                    .unwrap_or_default();
                println!("{published}  {}\n{}\n", notice.title, notice.body);
            }
        }
        Command::Attendance { session, marks } => {
            let records = editor
                .client()?
                .session_attendance(&session)
                .await
                .map_err(|e| editor.report(e.into()))?;
            let mut sheet = AttendanceSheet::from_records(&session, records);

            for mark in marks {
                let Some((player, status)) = mark
                    .split_once('=')
                    .and_then(|(p, s)| Some((p, s.parse::<AttendanceStatus>().ok()?)))
                else {
                    editor.report(EditorError::Validation(format!(
                        "Can't read attendance mark {mark:?}, expected PLAYER=STATUS"
                    )));
                    continue;
                };
                sheet.mark_optimistic(player, status);
                let request = editor.client()?.mark_attendance(&session, player, status);
                match request.await {
                    Ok(record) => sheet.confirm(record),
                    Err(e) => {
                        editor.report(e.into());
                    }
                }
            }

            let mut table = new_table(&["Player", "Status"]);
            for (player, status) in sheet.iter() {
                table.add_row(cells(&[player, &status.to_string()]));
            }
            table.printstd();
            let counts = enum_iterator::all::<AttendanceStatus>()
                .map(|status| format!("{status}: {}", sheet.count(status)))
                .collect::<Vec<_>>()
                .join(", ");
            println!("{counts}");
        }
    }
    Ok(())
}

async fn play(editor: &mut BoardEditor) -> Result<(), EditorError> {
    let mut index = editor.driver().subscribe();
    editor
        .driver_mut()
        .toggle_playback()
        .map_err(|e| editor.report(e.into()))?;
    index.borrow_and_update();
    print_board(editor);

    loop {
        if index.changed().await.is_err() {
            break;
        }
        print_board(editor);
        if !editor.driver().lock().is_playing() {
            break;
        }
    }
    editor.driver_mut().playback_finished().await;
    Ok(())
}

fn print_board(editor: &BoardEditor) {
    let board = editor.driver().lock();
    let frame = board.snapshot();
    println!(
        "{}",
        render::render_grid(&frame, board.field_size(), render::GRID_COLS, render::GRID_ROWS)
    );
    let position = if board.frames().is_empty() {
        "no animation".to_string()
    } else {
        format!("frame {}/{}", board.playback_index() + 1, board.frames().len())
    };
    println!("{}, {position}", render::summary(&frame));
}

fn new_table(titles: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(cells(titles));
    table
}

fn cells(values: &[&str]) -> Row {
    Row::new(values.iter().map(|v| Cell::new(v)).collect())
}
