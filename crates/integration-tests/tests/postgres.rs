//! Repository queries against a real `PostgreSQL`.
//!
//! Each test gets a fresh database with the migrations applied. They need
//! `DATABASE_URL` to point at a server where the user may create databases:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/delicious \
//!     cargo test -p delicious-integration-tests --test postgres -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use delicious_core::{Email, StoreId};
use delicious_web::db::Repos;
use delicious_web::models::{NewUser, User};
use delicious_web::services::StoreService;
use delicious_web::validation::StoreInput;
use sqlx::PgPool;

fn input(name: &str, description: &str, tags: &[&str]) -> StoreInput {
    StoreInput {
        name: name.to_owned(),
        description: description.to_owned(),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        address: "1 Main St".to_owned(),
        longitude: "-79.38".to_owned(),
        latitude: "43.65".to_owned(),
    }
}

async fn user(repos: &Repos, email: &str) -> User {
    repos
        .users
        .create(&NewUser {
            name: "Wes".to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
        })
        .await
        .unwrap()
}

async fn add(service: &StoreService<'_>, author: &User, name: &str) -> StoreId {
    service
        .create_store(author.id, &input(name, "", &[]), None)
        .await
        .unwrap()
        .id
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_same_name_gets_suffixed_slug(pool: PgPool) {
    let repos = Repos::postgres(&pool);
    let service = StoreService::new(&repos);
    let wes = user(&repos, "wes@example.com").await;

    let mut slugs = Vec::new();
    for name in ["Coffee House", "Coffee House", "COFFEE HOUSE!"] {
        let store = service
            .create_store(wes.id, &input(name, "", &[]), None)
            .await
            .unwrap();
        slugs.push(store.slug.into_inner());
    }
    assert_eq!(slugs, ["coffee-house", "coffee-house-2", "coffee-house-3"]);

    // Only `pizza` and `pizza-<digits>` collide.
    add(&service, &wes, "Pizza Place").await;
    add(&service, &wes, "Pizzas").await;
    let pizza = service
        .create_store(wes.id, &input("Pizza", "", &[]), None)
        .await
        .unwrap();
    assert_eq!(pizza.slug.as_str(), "pizza");

    let found = service.store_by_slug("coffee-house-2").await.unwrap();
    assert!(found.is_some());
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_rename_reslugs_without_counting_itself(pool: PgPool) {
    let repos = Repos::postgres(&pool);
    let service = StoreService::new(&repos);
    let wes = user(&repos, "wes@example.com").await;
    let id = add(&service, &wes, "Old Name").await;

    let renamed = service
        .update_store(id, wes.id, &input("New Name", "", &[]), None)
        .await
        .unwrap();
    assert_eq!(renamed.store.slug.as_str(), "new-name");

    let again = service
        .update_store(id, wes.id, &input("New Name", "", &[]), None)
        .await
        .unwrap();
    assert_eq!(again.store.slug.as_str(), "new-name");
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_top_stores_ranking(pool: PgPool) {
    let repos = Repos::postgres(&pool);
    let service = StoreService::new(&repos);
    let wes = user(&repos, "wes@example.com").await;

    // Twelve reviewed stores with averages 1.5, 2.0, ... 5.0 (some repeated).
    for i in 0..12_u8 {
        let id = add(&service, &wes, &format!("Reviewed {i}")).await;
        let low = 1 + i % 5;
        let high = (low + 1).min(5);
        for rating in [low, high] {
            service
                .add_review(wes.id, id, "Noted", &rating.to_string())
                .await
                .unwrap();
        }
    }
    let lonely = add(&service, &wes, "Lonely").await;
    service.add_review(wes.id, lonely, "Only one", "5").await.unwrap();

    let top = service.top_stores().await.unwrap();

    assert_eq!(top.len(), 10);
    assert!(top.iter().all(|t| t.reviews.len() >= 2));
    assert!(top.iter().all(|t| t.name != "Lonely"));
    assert!(top.windows(2).all(|w| w[0].average_rating >= w[1].average_rating));
    assert!((top[0].average_rating - 5.0).abs() < f64::EPSILON);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_tag_counts(pool: PgPool) {
    let repos = Repos::postgres(&pool);
    let service = StoreService::new(&repos);
    let wes = user(&repos, "wes@example.com").await;

    let tagged: [(&str, &[&str]); 4] = [
        ("A", &["Wifi", "Licensed"]),
        ("B", &["Wifi"]),
        ("C", &["Vegetarian", "Wifi", "Licensed"]),
        ("D", &[]),
    ];
    for (name, tags) in tagged {
        service
            .create_store(wes.id, &input(name, "", tags), None)
            .await
            .unwrap();
    }

    let (counts, all) = service.stores_by_tag(None).await.unwrap();
    let pairs: usize = tagged.iter().map(|(_, tags)| tags.len()).sum();

    assert_eq!(all.len(), 4);
    assert_eq!(
        counts.iter().map(|c| c.count).sum::<i64>(),
        i64::try_from(pairs).unwrap()
    );
    assert!(counts.windows(2).all(|w| w[0].count >= w[1].count));
    assert_eq!((counts[0].tag.as_str(), counts[0].count), ("Wifi", 3));

    let (_, licensed) = service.stores_by_tag(Some("Licensed")).await.unwrap();
    let names: Vec<&str> = licensed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["A", "C"]);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_search(pool: PgPool) {
    let repos = Repos::postgres(&pool);
    let service = StoreService::new(&repos);
    let wes = user(&repos, "wes@example.com").await;

    for (name, description) in [
        ("Wing Palace", "Hot wings and cold beer"),
        ("Tea House", "Quiet tea room"),
        ("Corner Bakery", "Fresh bread baked daily"),
    ] {
        service
            .create_store(wes.id, &input(name, description, &[]), None)
            .await
            .unwrap();
    }

    assert!(service.search("").await.unwrap().is_empty());
    assert!(service.search("   ").await.unwrap().is_empty());
    assert!(service.search("sushi").await.unwrap().is_empty());
    assert!(service.search("the and of").await.unwrap().is_empty());

    // Terms are OR-ed, not AND-ed.
    let hits = service.search("wings tea").await.unwrap();
    let mut names: Vec<&str> = hits.iter().map(|h| h.store.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Tea House", "Wing Palace"]);

    let bakery = service.search("bakeries").await.unwrap();
    assert_eq!(bakery.len(), 1);
    assert_eq!(bakery[0].store.name, "Corner Bakery");
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "needs DATABASE_URL"]
async fn test_heart_toggle_and_reviews_on_read(pool: PgPool) {
    let repos = Repos::postgres(&pool);
    let service = StoreService::new(&repos);
    let wes = user(&repos, "wes@example.com").await;
    let id = add(&service, &wes, "Loved").await;

    let once = service.heart_store(wes.id, id).await.unwrap();
    assert_eq!(once.hearts, [id]);
    assert_eq!(service.hearted_stores(wes.id).await.unwrap().len(), 1);

    let twice = service.heart_store(wes.id, id).await.unwrap();
    assert_eq!(twice.hearts, wes.hearts);

    let missing = service.heart_store(wes.id, StoreId::new(9999)).await;
    assert!(missing.is_err());

    service.add_review(wes.id, id, "First", "3").await.unwrap();
    service.add_review(wes.id, id, "Second", "4").await.unwrap();
    let (store, author) = service.store_by_slug("loved").await.unwrap().unwrap();
    assert_eq!(author.unwrap().id, wes.id);
    let texts: Vec<&str> = store.reviews.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["Second", "First"]);
}
