pub mod agent;
pub mod approval;
pub mod capability;
pub mod history;
pub mod service;
pub mod tooling;
