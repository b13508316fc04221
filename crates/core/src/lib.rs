#![deny(warnings)]

pub mod animate;
pub mod capture;
pub mod config;
pub mod decode;
pub mod emotion;
pub mod orchestrator;
pub mod respond;
pub mod tts;
pub mod wav;
