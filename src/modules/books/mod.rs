pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use sqlx::SqlitePool;

use bookhub_kernel::{InitCtx, Migration, Module};

use repository::SqliteBookRepository;
use routes::BooksState;

/// Books module: catalog CRUD, the filtered listing, and the book
/// review page.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            state: BooksState {
                books: Arc::new(SqliteBookRepository::new(pool)),
            },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn api_routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::api::list_books).post(routes::api::create_book))
            .route("/{id}", get(routes::api::get_book))
            .route("/{id}/reviews", get(routes::api::book_reviews))
            .route("/health", get(routes::api::health_check))
            .with_state(self.state.clone())
    }

    fn web_routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::web::list))
            .route("/details/{id}", get(routes::web::details))
            .route(
                "/create",
                get(routes::web::create_form).post(routes::web::create),
            )
            .route(
                "/edit/{id}",
                get(routes::web::edit_form).post(routes::web::edit),
            )
            .route(
                "/delete/{id}",
                get(routes::web::delete_confirm).post(routes::web::delete),
            )
            .route("/reviews/{id}", get(routes::web::reviews_page))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books with optional genre/year/rating filters",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "genre", "in": "query", "schema": {"type": "string"}},
                            {"name": "year", "in": "query", "schema": {"type": "integer"}},
                            {"name": "rating", "in": "query", "schema": {"type": "integer"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "List of books with average ratings",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {
                                                "$ref": "#/components/schemas/BookSummary"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/CreateBook"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book"
                            },
                            "400": {
                                "description": "Validation failure",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing identity",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            },
                            "409": {
                                "description": "Duplicate title and author",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book with its reviews",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "Book detail",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/BookDetail"
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}/reviews": {
                    "get": {
                        "summary": "List a book's reviews",
                        "tags": ["Books"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "Review projections",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {
                                                "$ref": "#/components/schemas/Review"
                                            }
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/ErrorResponse"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookSummary": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "integer"},
                            "title": {"type": "string"},
                            "author": {"type": "string"},
                            "publishedYear": {"type": "integer"},
                            "genre": {"type": "string"},
                            "averageRating": {"type": "number"}
                        },
                        "required": ["id", "title", "author", "publishedYear", "genre", "averageRating"]
                    },
                    "BookDetail": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "integer"},
                            "title": {"type": "string"},
                            "author": {"type": "string"},
                            "publishedYear": {"type": "integer"},
                            "genre": {"type": "string"},
                            "reviews": {
                                "type": "array",
                                "items": {
                                    "$ref": "#/components/schemas/Review"
                                }
                            }
                        },
                        "required": ["id", "title", "author", "publishedYear", "genre", "reviews"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "author": {"type": "string"},
                            "publishedYear": {"type": "integer"},
                            "genre": {"type": "string"}
                        },
                        "required": ["title", "author", "publishedYear", "genre"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL CHECK (title <> ''),
                    author TEXT NOT NULL CHECK (author <> ''),
                    published_year INTEGER NOT NULL,
                    genre TEXT NOT NULL CHECK (genre <> ''),
                    user_id TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre);
                CREATE INDEX IF NOT EXISTS idx_books_title_author ON books(title, author);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(pool))
}
