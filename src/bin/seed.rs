use chrono::Utc;
use courier_ledger::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Shops,
        shops::{ActiveModel as ShopActive, Column as ShopCol},
    },
    error::AppError,
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    let state = AppState::new(orm, &config);

    let owner_id = Uuid::now_v7();
    let shop_id = ensure_shop(&state.orm, "Demo Shop", owner_id, 60.0).await?;

    match state.ledger.open_wallet(shop_id, owner_id).await {
        Ok(wallet) => println!("Opened wallet {} for shop {shop_id}", wallet.id),
        Err(AppError::Conflict(_)) => println!("Wallet for shop {shop_id} already exists"),
        Err(err) => return Err(err.into()),
    }

    println!("Seed completed. Shop ID: {shop_id}");
    Ok(())
}

async fn ensure_shop(
    orm: &DatabaseConnection,
    name: &str,
    owner_id: Uuid,
    base_charge: f64,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Shops::find()
        .filter(ShopCol::Name.eq(name))
        .one(orm)
        .await?
    {
        println!("Shop {name} already exists");
        return Ok(existing.id);
    }

    let now = Utc::now();
    let shop = ShopActive {
        id: Set(Uuid::now_v7()),
        owner_id: Set(owner_id),
        name: Set(name.to_string()),
        base_charge: Set(base_charge),
        delivery_zone: Set("Dhaka".to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured shop {name} (base charge {base_charge})");
    Ok(shop.id)
}
