//! Walkthrough of the data core against the in-memory gateway.
//!
//! Signs up a user, adds a friend, uploads a postcard annotated as sent
//! to them, and prints the merged records view.
//!
//! Run with: cargo run -p postcards --example local_demo

use std::sync::Arc;

use mock_store::MockStore;
use postcards::{merge_friend_records, Category, NewPostcard, Stores};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let gateway = Arc::new(MockStore::new());
    let stores = Stores::start(gateway).await;

    stores.session.sign_up("pika", "secret").await?;
    println!("signed in as {:?}", stores.session.current_user());

    stores.friends.create("Olimar").await?;
    stores.friends.create("Louie").await?;

    let image_url = stores
        .postcards
        .upload_image("fountain.png", vec![0u8; 16])
        .await?;
    stores
        .postcards
        .add_postcard(NewPostcard {
            title: "Central Park Fountain".to_string(),
            location: "New York".to_string(),
            country: "USA".to_string(),
            image_url,
            description: "Rest stop by the fountain.".to_string(),
            color: "#0ea5e9".to_string(),
            category: Category::Adventure,
            collected: "2024-01-02".parse()?,
            sent_to: vec!["Olimar".to_string()],
        })
        .await?;

    stores.exchange.fetch().await?;

    let friends = stores.friends.friends().await;
    let grouped = stores.exchange.grouped().await;
    let mut merged = merge_friend_records(&friends, &grouped);
    postcards::sort_groups_by_name(&mut merged);

    for group in &merged {
        println!("{} has received {} card(s)", group.friend_name, group.postcards.len());
        for card in &group.postcards {
            println!("  - {} ({})", card.title, card.date);
        }
    }

    stores.session.sign_out().await?;
    Ok(())
}
