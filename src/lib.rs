pub mod core {
    pub mod config;
    pub mod error;
    pub mod startup;
    pub mod tracing_init;
}

pub mod api {
    pub mod qbittorrent;
    pub mod tracker;
}

pub mod models {
    pub mod listing;
    pub mod managed;
}

pub mod notify {
    pub mod telegram;
}

pub mod stores {
    pub mod tag_store;
}

pub mod sweep {
    pub mod decision;
    pub mod sweeper;
}

pub mod utils {
    pub mod time;
}
