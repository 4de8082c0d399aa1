//! Diesel table definitions.
//!
//! These must match `backend/migrations` exactly.

diesel::table! {
    /// Registered users. `LOWER(username)` carries a unique index.
    users (id) {
        id -> Int4,
        username -> Varchar,
        password -> Text,
        display_name -> Nullable<Varchar>,
        created_at -> Timestamptz,
        environment -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Cached catalog titles, unique on `tmdb_id`.
    movies (id) {
        id -> Int4,
        tmdb_id -> Int4,
        title -> Text,
        overview -> Nullable<Text>,
        poster_path -> Nullable<Text>,
        backdrop_path -> Nullable<Text>,
        release_date -> Nullable<Varchar>,
        vote_average -> Nullable<Float8>,
        genres -> Array<Text>,
        media_type -> Varchar,
        runtime -> Nullable<Int4>,
        number_of_seasons -> Nullable<Int4>,
        number_of_episodes -> Nullable<Int4>,
    }
}

diesel::table! {
    /// Streaming platforms owned by a user.
    platforms (id) {
        id -> Int4,
        user_id -> Int4,
        name -> Varchar,
        logo_url -> Nullable<Text>,
        is_default -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tracked titles, unique on `(user_id, movie_id)`.
    watchlist_entries (id) {
        id -> Int4,
        user_id -> Int4,
        movie_id -> Int4,
        platform_id -> Nullable<Int4>,
        status -> Varchar,
        watched_date -> Nullable<Timestamptz>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(platforms -> users (user_id));
diesel::joinable!(watchlist_entries -> movies (movie_id));
diesel::joinable!(watchlist_entries -> platforms (platform_id));
diesel::joinable!(watchlist_entries -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(movies, platforms, users, watchlist_entries);
