// Mirrors the CREATE TABLE statements in schema.rs.

diesel::table! {
    users (ip) {
        ip -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    sites (domain) {
        domain -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    tallies (site_domain) {
        site_domain -> Text,
        up_votes -> BigInt,
        down_votes -> BigInt,
    }
}

diesel::table! {
    votes (user_ip, site_domain) {
        user_ip -> Text,
        site_domain -> Text,
        value -> Integer,
        updated_at -> Text,
    }
}

diesel::table! {
    credibility_scores (site_domain) {
        site_domain -> Text,
        score -> Double,
        created_at -> Text,
    }
}

diesel::joinable!(tallies -> sites (site_domain));
diesel::joinable!(votes -> sites (site_domain));
diesel::joinable!(votes -> users (user_ip));
diesel::joinable!(credibility_scores -> sites (site_domain));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    sites,
    tallies,
    votes,
    credibility_scores,
);
