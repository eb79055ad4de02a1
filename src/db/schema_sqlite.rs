// Tables created by sql/seed.sql

diesel::table! {
    users (id) {
        id -> Integer,
        name -> Text,
        password -> Text,
    }
}

diesel::table! {
    posts (id) {
        id -> Integer,
        title -> Text,
        body -> Text,
    }
}
