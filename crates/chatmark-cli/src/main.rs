//! chatmark - ChatGPT conversation exporter
//!
//! Turns exported conversation JSON into Markdown, HTML or JSON documents.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default configuration
//! chatmark config init
//!
//! # Export one conversation
//! chatmark export conversation.json --format html
//!
//! # Export a whole data dump into one archive
//! chatmark batch conversations.json --output all.zip
//! ```

mod commands;

#[tokio::main]
async fn main() {
    if let Err(err) = commands::run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
