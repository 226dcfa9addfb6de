use rusqlite::Connection;
use shelfmark_core::db::open_db_in_memory;
use shelfmark_core::{
    Book, BookRepository, ReviewService, ReviewServiceError, Role, SqliteBookRepository,
    SqliteReviewRepository, SqliteUserRepository, User, UserRepository,
};

fn create_user(conn: &Connection, email: &str, role: Role) -> User {
    let user = User::new(email, "Reviewer", role);
    SqliteUserRepository::new(conn).create_user(&user).unwrap();
    user
}

fn create_book(conn: &mut Connection, title: &str) -> Book {
    let book = Book::new(title, "Some Author");
    SqliteBookRepository::new(conn).create_book(&book).unwrap();
    book
}

fn review_count(conn: &Connection, book: &Book) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE book_uuid = ?1;",
        [book.uuid.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn resubmitting_overwrites_instead_of_adding_a_row() {
    let mut conn = open_db_in_memory().unwrap();
    let reader = create_user(&conn, "reader@example.com", Role::Member);
    let book = create_book(&mut conn, "Twice Rated");

    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    let first = service
        .submit_review(reader.uuid, book.uuid, 2, Some("rough start".to_string()))
        .unwrap();
    let second = service
        .submit_review(reader.uuid, book.uuid, 5, Some("it grew on me".to_string()))
        .unwrap();

    // Same row: the overwrite keeps the original id and creation time.
    assert_eq!(second.uuid, first.uuid);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.rating, 5);
    assert_eq!(second.comment.as_deref(), Some("it grew on me"));
    assert_eq!(review_count(&conn, &book), 1);

    let summary = service.rating_summary(book.uuid).unwrap();
    assert_eq!(summary.review_count, 1);
    assert_eq!(summary.average_rating, Some(5.0));
}

#[test]
fn out_of_range_ratings_are_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let reader = create_user(&conn, "reader@example.com", Role::Member);
    let book = create_book(&mut conn, "Strictly Rated");

    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    for rating in [0, 6] {
        let err = service
            .submit_review(reader.uuid, book.uuid, rating, None)
            .unwrap_err();
        assert!(matches!(err, ReviewServiceError::InvalidRating(r) if r == rating));
    }
    assert_eq!(review_count(&conn, &book), 0);
}

#[test]
fn reviewing_a_missing_book_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let reader = create_user(&conn, "reader@example.com", Role::Member);

    let missing = uuid::Uuid::new_v4();
    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    let err = service
        .submit_review(reader.uuid, missing, 4, None)
        .unwrap_err();
    assert!(matches!(err, ReviewServiceError::BookNotFound(id) if id == missing));
}

#[test]
fn listing_returns_newest_first_with_reviewer_names() {
    let mut conn = open_db_in_memory().unwrap();
    let early = create_user(&conn, "early@example.com", Role::Member);
    let late = create_user(&conn, "late@example.com", Role::Member);
    let book = create_book(&mut conn, "Much Discussed");

    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    let first = service.submit_review(early.uuid, book.uuid, 3, None).unwrap();
    let second = service.submit_review(late.uuid, book.uuid, 4, None).unwrap();

    conn.execute(
        "UPDATE reviews SET created_at = 1000 WHERE uuid = ?1;",
        [first.uuid.to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE reviews SET created_at = 2000 WHERE uuid = ?1;",
        [second.uuid.to_string()],
    )
    .unwrap();

    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    let records = service.list_for_book(book.uuid).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].review.uuid, second.uuid);
    assert_eq!(records[0].user_name, "Reviewer");
    assert_eq!(records[1].review.uuid, first.uuid);
}

#[test]
fn only_the_author_or_an_admin_may_delete() {
    let mut conn = open_db_in_memory().unwrap();
    let author = create_user(&conn, "author@example.com", Role::Member);
    let other = create_user(&conn, "other@example.com", Role::Member);
    let librarian = create_user(&conn, "librarian@example.com", Role::Librarian);
    let admin = create_user(&conn, "admin@example.com", Role::Admin);
    let book = create_book(&mut conn, "Contested Opinions");

    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    let review = service.submit_review(author.uuid, book.uuid, 4, None).unwrap();

    let err = service
        .delete_review(review.uuid, other.uuid, Role::Member)
        .unwrap_err();
    assert!(matches!(err, ReviewServiceError::NotPermitted { .. }));

    // Librarians administer loans, not other people's reviews.
    let err = service
        .delete_review(review.uuid, librarian.uuid, Role::Librarian)
        .unwrap_err();
    assert!(matches!(err, ReviewServiceError::NotPermitted { .. }));

    service
        .delete_review(review.uuid, admin.uuid, Role::Admin)
        .unwrap();
    assert_eq!(review_count(&conn, &book), 0);

    let err = service
        .delete_review(review.uuid, admin.uuid, Role::Admin)
        .unwrap_err();
    assert!(matches!(err, ReviewServiceError::ReviewNotFound(_)));
}

#[test]
fn empty_books_have_no_average() {
    let mut conn = open_db_in_memory().unwrap();
    let book = create_book(&mut conn, "Unread");

    let service = ReviewService::new(SqliteReviewRepository::new(&conn));
    let summary = service.rating_summary(book.uuid).unwrap();
    assert_eq!(summary.average_rating, None);
    assert_eq!(summary.review_count, 0);
}
