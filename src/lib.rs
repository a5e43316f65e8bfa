//! Psalter - a devotional blog CMS
//!
//! Posts, categories, static pages, comments and an editable footer, with
//! site sections that administrators can hide at runtime. Visibility changes
//! reach every subscriber in the process immediately and other processes by
//! polling the shared store.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
