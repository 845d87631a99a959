pub mod modules{
    pub mod config;

    pub mod fleet{
        pub mod order;
        pub mod state;
        pub mod identity;
    }

    pub mod net{
        pub mod bcast;
        pub mod messages;
    }

    pub mod peer{
        pub mod monitor;
    }

    pub mod role{
        pub mod transition;
        pub mod manager;
    }

    pub mod active_set;

    pub mod dispatch{
        pub mod cost;
        pub mod dispatcher;
        pub mod stall;
    }

    pub mod backup;

    pub mod car{
        pub mod queue;
        pub mod position;
        pub mod runner;
        pub mod lights;
    }

    pub mod elevio{
        pub mod elev;
        pub mod poll;
    }

    pub mod system_init;
}
