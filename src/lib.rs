#![doc = "script-speech: screenplay-to-speech pipeline and cooperative background task scheduling."]

//! Converts an ordered sequence of screenplay elements into speakable items and runs that
//! conversion as a cancellable, checkpointed background task.
//!
//! # Pipeline
//! [`normalizer`] → [`scene`] → [`rules`] → [`processor`]
//!
//! # Scheduling
//! [`task`] → [`generation`] → [`manager`]
//!
//! Persistence is a collaborator behind [`contract::ItemStore`]; [`store`] ships an in-memory
//! and a JSON-lines implementation.

pub mod cli;
pub mod config;
pub mod contract;
pub mod element;
pub mod error;
pub mod generation;
pub mod item;
pub mod load_config;
pub mod manager;
pub mod normalizer;
pub mod processor;
pub mod rules;
pub mod scene;
pub mod store;
pub mod task;

pub use cli::{run, Cli, Commands};
pub use contract::{ItemStore, TaskExecutor};
pub use element::{ElementType, SceneLocation, ScreenplayDocument, ScreenplayElement};
pub use error::{PersistenceError, RulesError, TaskError};
pub use generation::{GenerationSummary, SpeakableItemGenerationTask};
pub use item::{ItemStatus, SpeakableItem, ToneHint};
pub use manager::BackgroundTaskManager;
pub use processor::ScreenplaySpeechProcessor;
pub use task::{BackgroundTask, TaskContext, TaskSnapshot, TaskState};
