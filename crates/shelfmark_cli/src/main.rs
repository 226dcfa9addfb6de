//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `shelfmark_core` linkage.
//! - Seed a demo catalog into a SQLite file for local exploration.
//!
//! Usage:
//! - `shelfmark_cli` prints version info.
//! - `shelfmark_cli seed <path>` creates/seeds a demo database.

use shelfmark_core::db::open_db;
use shelfmark_core::{
    BookDraft, CatalogService, Role, SqliteBookRepository, SqliteUserRepository, User,
    UserRepository,
};

fn main() {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => {
            println!("shelfmark_core version={}", shelfmark_core::core_version());
        }
        Some("seed") => {
            let Some(path) = args.next() else {
                eprintln!("usage: shelfmark_cli seed <path>");
                std::process::exit(2);
            };
            if let Err(err) = seed(&path) {
                eprintln!("seed failed: {err}");
                std::process::exit(1);
            }
            println!("seeded demo catalog at {path}");
        }
        Some(other) => {
            eprintln!("unknown command `{other}`; usage: shelfmark_cli [seed <path>]");
            std::process::exit(2);
        }
    }
}

fn seed(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = open_db(path)?;

    for (email, name, role) in [
        ("admin@library.com", "Admin User", Role::Admin),
        ("librarian@library.com", "Librarian User", Role::Librarian),
        ("member@library.com", "Member User", Role::Member),
    ] {
        let users = SqliteUserRepository::new(&conn);
        users.create_user(&User::new(email, name, role))?;
    }

    let catalog = CatalogService::new(SqliteBookRepository::new(&mut conn));
    for draft in demo_books() {
        catalog.create_book(draft)?;
    }

    Ok(())
}

fn demo_books() -> Vec<BookDraft> {
    vec![
        BookDraft {
            title: "The Great Gatsby".to_string(),
            author: "F. Scott Fitzgerald".to_string(),
            isbn: Some("978-0743273565".to_string()),
            publisher: Some("Scribner".to_string()),
            published_year: Some(1925),
            category: Some("Fiction".to_string()),
            description: Some("A classic American novel set in the Jazz Age.".to_string()),
            total_copies: Some(3),
            tags: Some("classic,american,jazz-age".to_string()),
            ..BookDraft::default()
        },
        BookDraft {
            title: "1984".to_string(),
            author: "George Orwell".to_string(),
            isbn: Some("978-0451524935".to_string()),
            publisher: Some("Signet Classic".to_string()),
            published_year: Some(1949),
            category: Some("Science Fiction".to_string()),
            description: Some("A dystopian social science fiction novel.".to_string()),
            total_copies: Some(5),
            tags: Some("dystopian,politics,surveillance".to_string()),
            ..BookDraft::default()
        },
        BookDraft {
            title: "To Kill a Mockingbird".to_string(),
            author: "Harper Lee".to_string(),
            isbn: Some("978-0060935467".to_string()),
            publisher: Some("Harper Perennial".to_string()),
            published_year: Some(1960),
            category: Some("Fiction".to_string()),
            description: Some(
                "A gripping tale of racial injustice and childhood innocence.".to_string(),
            ),
            total_copies: Some(4),
            tags: Some("classic,justice,coming-of-age".to_string()),
            ..BookDraft::default()
        },
        BookDraft {
            title: "Harry Potter and the Philosopher's Stone".to_string(),
            author: "J.K. Rowling".to_string(),
            isbn: Some("978-0439708180".to_string()),
            publisher: Some("Scholastic".to_string()),
            published_year: Some(1997),
            category: Some("Fantasy".to_string()),
            description: Some("The first book in the Harry Potter series.".to_string()),
            total_copies: Some(6),
            tags: Some("magic,adventure,young-adult".to_string()),
            ..BookDraft::default()
        },
    ]
}
