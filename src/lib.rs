pub mod config;
pub mod dialog;
pub mod error;
pub mod memory;
pub mod message;
pub mod services;
pub mod skills;
pub mod testing;

pub mod prelude {
    pub use crate::config::SkillConfig;
    pub use crate::dialog::{DialogueEngine, DialogueState, KeywordAction, StateMachine, Trigger, Vocab};
    pub use crate::error::Result;
    pub use crate::message::Msg;
    pub use crate::skills::{Skill, SkillManager, WeatherSkill};
}
