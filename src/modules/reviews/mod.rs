pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

use bookhub_kernel::{InitCtx, Migration, Module};

use crate::modules::books::repository::SqliteBookRepository;
use repository::SqliteReviewRepository;
use routes::ReviewsState;

/// Reviews module: review CRUD plus per-user voting.
pub struct ReviewsModule {
    state: ReviewsState,
}

impl ReviewsModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            state: ReviewsState {
                reviews: Arc::new(SqliteReviewRepository::new(pool.clone())),
                books: Arc::new(SqliteBookRepository::new(pool)),
            },
        }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "reviews module initialized"
        );
        Ok(())
    }

    fn api_routes(&self) -> Router {
        Router::new()
            .route("/", post(routes::api::create_review))
            .route("/book/{book_id}", get(routes::api::reviews_for_book))
            .route("/{id}/vote", post(routes::api::vote))
            .route("/health", get(routes::api::health_check))
            .with_state(self.state.clone())
    }

    fn web_routes(&self) -> Router {
        Router::new()
            .route("/", get(routes::web::list))
            .route("/details/{id}", get(routes::web::details))
            .route("/create", post(routes::web::create))
            .route(
                "/edit/{id}",
                get(routes::web::edit_form).post(routes::web::edit),
            )
            .route(
                "/delete/{id}",
                get(routes::web::delete_confirm).post(routes::web::delete),
            )
            .route("/vote", post(routes::web::vote))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Create a review",
                        "tags": ["Reviews"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/CreateReview"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Created review",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "$ref": "#/components/schemas/Review"
                                        }
                                    }
                                }
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
                "/book/{bookId}": {
                    "get": {
                        "summary": "List reviews for a book",
                        "tags": ["Reviews"],
                        "parameters": [
                            {"name": "bookId", "in": "path", "required": true, "schema": {"type": "integer"}}
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
                },
                "/{id}/vote": {
                    "post": {
                        "summary": "Cast or change a vote on a review",
                        "tags": ["Reviews"],
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                        ],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "$ref": "#/components/schemas/VoteInput"
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Vote recorded",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "success": {"type": "boolean"}
                                            }
                                        }
                                    }
                                }
                            },
                            "404": {
                                "description": "Review not found",
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
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "integer"},
                            "content": {"type": "string"},
                            "rating": {"type": "integer", "minimum": 1, "maximum": 5},
                            "dateCreated": {"type": "string", "format": "date-time"},
                            "userId": {"type": "string"}
                        },
                        "required": ["id", "content", "rating", "dateCreated", "userId"]
                    },
                    "CreateReview": {
                        "type": "object",
                        "properties": {
                            "content": {"type": "string"},
                            "rating": {"type": "integer", "minimum": 1, "maximum": 5},
                            "bookId": {"type": "integer"}
                        },
                        "required": ["content", "rating", "bookId"]
                    },
                    "VoteInput": {
                        "type": "object",
                        "properties": {
                            "isUpvote": {"type": "boolean"}
                        },
                        "required": ["isUpvote"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    content TEXT NOT NULL CHECK (content <> ''),
                    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                    date_created TEXT NOT NULL,
                    book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_reviews_book_id ON reviews(book_id);
                CREATE TABLE IF NOT EXISTS review_votes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
                    user_id TEXT NOT NULL,
                    is_upvote INTEGER NOT NULL,
                    UNIQUE (review_id, user_id)
                );
                CREATE INDEX IF NOT EXISTS idx_review_votes_review_id ON review_votes(review_id);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

/// Create a new instance of the reviews module
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(ReviewsModule::new(pool))
}
