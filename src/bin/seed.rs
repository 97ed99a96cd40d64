use shopfront_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    models::{ADMIN_ROLE, DEFAULT_ROLE},
    password::PasswordKdf,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;

    let kdf = PasswordKdf::default();
    let admin_id = ensure_user(&pool, &kdf, "admin@example.com", "Admin", "admin12345", ADMIN_ROLE).await?;
    let user_id = ensure_user(&pool, &kdf, "user@example.com", "Demo User", "user12345", DEFAULT_ROLE).await?;
    seed_products(&pool).await?;

    pool.close().await;
    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    kdf: &PasswordKdf,
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<i32> {
    let hashed = kdf.hash(password);

    // Existing accounts keep their password; only the role is forced.
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO users (email, name, hashed_password, salt, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(hashed.hash)
    .bind(hashed.salt)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products = [
        ("Axum Hoodie", 550_000_i64, 50, "apparel"),
        ("Ferris Mug", 120_000, 100, "kitchen"),
        ("Rust Sticker Pack", 50_000, 200, "accessories"),
        ("E-book: Async Rust", 250_000, 75, "books"),
    ];

    for (name, price, stock, category) in products {
        sqlx::query(
            r#"
            INSERT INTO products (name, price, stock, category)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(price)
        .bind(stock)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
