diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Text,
        password_hash -> Text,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    organizations (id) {
        id -> Uuid,
        name -> Text,
        default_currency -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    organization_members (id) {
        id -> Uuid,
        organization_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    contacts (id) {
        id -> Uuid,
        organization_id -> Uuid,
        owner_id -> Uuid,
        name -> Text,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    deals (id) {
        id -> Uuid,
        organization_id -> Uuid,
        contact_id -> Uuid,
        owner_id -> Uuid,
        title -> Text,
        amount -> Numeric,
        currency -> Text,
        status -> Text,
        stage -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tasks (id) {
        id -> Uuid,
        deal_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        due_date -> Nullable<Date>,
        is_done -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    activities (id) {
        id -> Uuid,
        deal_id -> Uuid,
        author_id -> Nullable<Uuid>,
        kind -> Text,
        payload -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(organization_members -> organizations (organization_id));
diesel::joinable!(organization_members -> users (user_id));
diesel::joinable!(contacts -> organizations (organization_id));
diesel::joinable!(deals -> organizations (organization_id));
diesel::joinable!(deals -> contacts (contact_id));
diesel::joinable!(tasks -> deals (deal_id));
diesel::joinable!(activities -> deals (deal_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    organizations,
    organization_members,
    contacts,
    deals,
    tasks,
    activities,
);
