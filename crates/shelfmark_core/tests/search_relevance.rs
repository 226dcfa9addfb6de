use rusqlite::Connection;
use shelfmark_core::db::open_db_in_memory;
use shelfmark_core::{
    smart_search, Book, BookRepository, Role, ReviewRepository, SqliteBookRepository,
    SqliteReviewRepository, SqliteUserRepository, User, UserRepository,
};

fn create_book(conn: &mut Connection, title: &str, author: &str) -> Book {
    let book = Book::new(title, author);
    SqliteBookRepository::new(conn).create_book(&book).unwrap();
    book
}

fn make_unavailable(conn: &Connection, book: &Book) {
    conn.execute(
        "UPDATE books SET available_copies = 0 WHERE uuid = ?1;",
        [book.uuid.to_string()],
    )
    .unwrap();
}

#[test]
fn title_and_author_weights_produce_exact_scores() {
    let mut conn = open_db_in_memory().unwrap();
    let book = create_book(&mut conn, "Robot Wars", "Al Space");
    make_unavailable(&conn, &book);

    let hits = smart_search(&conn, "space robot").unwrap();
    assert_eq!(hits.len(), 1);
    // title hit (10) + author hit (8), no availability boost.
    assert_eq!(hits[0].score, 18);
    assert_eq!(hits[0].book.uuid, book.uuid);
    assert_eq!(hits[0].average_rating, None);
    assert_eq!(hits[0].review_count, 0);
}

#[test]
fn availability_adds_a_flat_boost_once() {
    let mut conn = open_db_in_memory().unwrap();
    create_book(&mut conn, "Robot Wars", "Al Space");

    let hits = smart_search(&conn, "space robot").unwrap();
    assert_eq!(hits[0].score, 20);
}

#[test]
fn description_and_tag_hits_use_the_fallback_weight() {
    let mut conn = open_db_in_memory().unwrap();
    let mut book = Book::new("Quiet Evenings", "P. Writer");
    book.description = Some("A robot learns to garden".to_string());
    SqliteBookRepository::new(&mut conn)
        .create_book(&book)
        .unwrap();
    make_unavailable(&conn, &book);

    let mut tagged = Book::new("Other Hours", "Q. Writer");
    tagged.tags = Some("gardening,robot,seasons".to_string());
    SqliteBookRepository::new(&mut conn)
        .create_book(&tagged)
        .unwrap();
    make_unavailable(&conn, &tagged);

    let hits = smart_search(&conn, "robot").unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.score == 3));
}

#[test]
fn queries_with_only_short_terms_return_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    create_book(&mut conn, "Robot Wars", "Al Space");

    assert!(smart_search(&conn, "ro wa").unwrap().is_empty());
    assert!(smart_search(&conn, "   ").unwrap().is_empty());
    assert!(smart_search(&conn, "").unwrap().is_empty());
}

#[test]
fn available_books_surface_even_without_term_hits() {
    // The flat availability boost alone clears the score>0 filter; an
    // unavailable book with no term hit stays excluded.
    let mut conn = open_db_in_memory().unwrap();
    let in_stock = create_book(&mut conn, "Cooking at Home", "M. Chef");
    let out_of_stock = create_book(&mut conn, "Baking at Home", "N. Chef");
    make_unavailable(&conn, &out_of_stock);

    let hits = smart_search(&conn, "robot").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].book.uuid, in_stock.uuid);
    assert_eq!(hits[0].score, 2);
}

#[test]
fn results_rank_by_score_with_insertion_order_ties() {
    let mut conn = open_db_in_memory().unwrap();
    // All unavailable so the boost cannot reorder anything.
    let by_description = {
        let mut book = Book::new("Evening Tales", "A. First");
        book.description = Some("robot stories".to_string());
        SqliteBookRepository::new(&mut conn)
            .create_book(&book)
            .unwrap();
        make_unavailable(&conn, &book);
        book
    };
    let by_title_a = create_book(&mut conn, "Robot Dawn", "B. Second");
    make_unavailable(&conn, &by_title_a);
    let by_title_b = create_book(&mut conn, "Robot Dusk", "C. Third");
    make_unavailable(&conn, &by_title_b);

    let hits = smart_search(&conn, "robot").unwrap();
    let order: Vec<_> = hits.iter().map(|hit| hit.book.uuid).collect();
    // Title hits (10) beat the description hit (3); the two title hits tie
    // and keep store insertion order.
    assert_eq!(order, vec![by_title_a.uuid, by_title_b.uuid, by_description.uuid]);
}

#[test]
fn results_are_capped_at_twenty() {
    let mut conn = open_db_in_memory().unwrap();
    for i in 0..25 {
        create_book(&mut conn, &format!("Robot Volume {i}"), "Serial Author");
    }

    let hits = smart_search(&conn, "robot").unwrap();
    assert_eq!(hits.len(), 20);
}

#[test]
fn hits_carry_rating_aggregates() {
    let mut conn = open_db_in_memory().unwrap();
    let book = create_book(&mut conn, "Robot Wars", "Al Space");

    let reviewer_a = User::new("a@example.com", "Reader A", Role::Member);
    let reviewer_b = User::new("b@example.com", "Reader B", Role::Member);
    {
        let users = SqliteUserRepository::new(&conn);
        users.create_user(&reviewer_a).unwrap();
        users.create_user(&reviewer_b).unwrap();

        let reviews = SqliteReviewRepository::new(&conn);
        reviews
            .upsert_review(&shelfmark_core::Review::new(book.uuid, reviewer_a.uuid, 5))
            .unwrap();
        reviews
            .upsert_review(&shelfmark_core::Review::new(book.uuid, reviewer_b.uuid, 4))
            .unwrap();
    }

    let hits = smart_search(&conn, "robot").unwrap();
    assert_eq!(hits[0].review_count, 2);
    assert_eq!(hits[0].average_rating, Some(4.5));
}
