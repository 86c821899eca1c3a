pub mod side;

pub mod bundles;

pub mod scene;

pub mod board;

pub mod attendance;

pub mod config;

pub mod portal;

pub mod field_support {
    pub const FIELD_MIN_PERCENT: f64 = 0.0;
    pub const FIELD_MAX_PERCENT: f64 = 100.0;
    pub const FIELD_CENTER_PERCENT: f64 = 50.0;
}
