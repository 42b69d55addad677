//! Tests for the resource stores.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use crate::xds::{Cluster, ClusterStore, Listener, ListenerStore, SocketAddress};

    fn endpoint(port: u16) -> SocketAddress {
        SocketAddress::from(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn cluster(name: &str, port: u16) -> Cluster {
        Cluster::new(name, vec![endpoint(port)])
    }

    #[test]
    fn test_set_reports_new_names_only() {
        let store = ClusterStore::new();
        assert!(store.set(cluster("a", 9000)));
        assert!(!store.set(cluster("a", 9001)));
        assert_eq!(store.len(), 1);

        let listed = store.list_all();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].endpoints, vec![endpoint(9001)]);
    }

    #[test]
    fn test_list_all_keeps_insertion_order() {
        let store = ClusterStore::new();
        store.set(cluster("c", 1));
        store.set(cluster("a", 2));
        store.set(cluster("b", 3));
        store.set(cluster("a", 4));

        assert_eq!(store.names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_remove_reports_existence() {
        let store = ClusterStore::new();
        store.set(cluster("a", 1));
        store.set(cluster("b", 2));
        store.set(cluster("c", 3));

        assert!(store.remove("b"));
        assert!(!store.remove("b"));
        assert!(!store.remove("missing"));
        assert_eq!(store.names(), vec!["a", "c"]);
        assert!(store.get("b").is_none());
    }

    #[test]
    fn test_resources_follow_store_contents() {
        let store = ListenerStore::new();
        assert!(store.is_empty());
        store.set(Listener::http(
            "entrypoint",
            SocketAddress::from(SocketAddr::from(([0, 0, 0, 0], 8080))),
            vec!["*".into()],
            "service",
        ));

        let resources = store.resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "entrypoint");
        assert_eq!(resources[0].body["name"], "entrypoint");
    }

    /// Writers replace whole entries; a reader never sees a cluster whose
    /// endpoints come from two different writes.
    #[test]
    fn test_concurrent_readers_see_whole_entries() {
        let store = Arc::new(ClusterStore::new());
        let stop = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..4u16)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..500u16 {
                        let port = w * 1000 + i;
                        let name = format!("c{}", i % 8);
                        store.set(Cluster::new(
                            name,
                            vec![endpoint(port), endpoint(port), endpoint(port)],
                        ));
                        if i % 5 == 0 {
                            store.remove(&format!("c{}", (i + 3) % 8));
                        }
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let store = store.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        let listed = store.list_all();
                        let mut names: Vec<_> = listed.iter().map(|c| c.name.clone()).collect();
                        names.sort();
                        names.dedup();
                        assert_eq!(names.len(), listed.len(), "duplicate names listed");
                        for c in listed {
                            assert_eq!(c.endpoints.len(), 3);
                            assert!(c.endpoints.iter().all(|e| *e == c.endpoints[0]));
                        }
                    }
                })
            })
            .collect();

        for w in writers {
            w.join().expect("writer panicked");
        }
        stop.store(true, Ordering::SeqCst);
        for r in readers {
            r.join().expect("reader panicked");
        }
    }
}
