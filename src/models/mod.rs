// ============================================================================
// MODELS - ENTRY POINT
// ============================================================================
//
// Description:
//   One module per database table, mapped with SeaORM.
//
// Modules:
//   - health : Health check API
//   - users : Accounts with role-based access (user/moderator/admin)
//   - category : Work categories (film, book, ...), slug-keyed
//   - genre : Work genres (drama, sci-fi, ...), slug-keyed
//   - title : Reviewable works
//   - title_genre : Title <-> genre join table
//   - review : Scored reviews, one per (author, title)
//   - comment : Comments attached to reviews
//   - dto : Data Transfer Objects for API responses
//
// Notes:
//   - All models go through SeaORM (no raw SQL)
//   - Relations between tables are declared in each model
//   - The (author, title) review uniqueness also lives in a DB index,
//     see db::init_schema
//
// ============================================================================

pub mod category;
pub mod comment;
pub mod dto;
pub mod genre;
pub mod health;
pub mod review;
pub mod title;
pub mod title_genre;
pub mod users;
