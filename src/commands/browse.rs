use anyhow::Result;

use gallery_core::AppConfig;

use super::login;

pub async fn galleries(config: AppConfig) -> Result<()> {
    let mut logged_in = login(&config).await?;
    let galleries = logged_in
        .manager
        .fetch_galleries(&mut logged_in.session, config.session.user_id.as_deref())
        .await?;

    if galleries.is_empty() {
        println!("No galleries found");
        return Ok(());
    }

    println!("Found {} galleries:\n", galleries.len());
    for g in galleries {
        println!("  {}: {} ({} icons)", g.id, g.name, g.icon_count);
    }
    Ok(())
}

pub async fn icons(config: AppConfig, gallery_id: &str) -> Result<()> {
    let mut logged_in = login(&config).await?;
    let icons = logged_in
        .manager
        .fetch_gallery_icons(&mut logged_in.session, gallery_id)
        .await?;

    println!("Gallery {} has {} icons:\n", gallery_id, icons.len());
    for icon in icons {
        println!("  {} - {}", icon.keyword, icon.url);
    }
    Ok(())
}

pub async fn fetch(config: AppConfig, path: &str) -> Result<()> {
    let mut logged_in = login(&config).await?;
    let page = logged_in.manager.fetch_page(&mut logged_in.session, path).await?;
    println!("{}", page.text());
    Ok(())
}
