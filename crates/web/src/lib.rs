#![forbid(unsafe_code)]

//! TopData web service: a three-step wizard that turns a transcription factor and cell
//! type selection into a UCSC track hub, plus the plain-text hub files the browser fetches.

pub mod config;
pub mod forms;
pub mod html;
pub mod http;
pub mod loader;
pub mod pages;
pub mod routes;
pub mod server;
pub mod views;
