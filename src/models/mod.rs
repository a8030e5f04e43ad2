pub mod agent;
pub mod application;
pub mod assignment;
pub mod dashboard;
pub mod delivery;
pub mod document;
pub mod notification;
