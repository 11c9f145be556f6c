pub mod menu;
pub mod message_template;
pub mod theme;
pub mod topic;
