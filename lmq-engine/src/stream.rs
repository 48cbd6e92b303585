//! Lazy, single-pass block streams.
//!
//! Elements travel as unevaluated thunks so that `parallel()` can ship
//! each element's whole map/filter chain to the executor. `collect`
//! preserves input order through indexed result slots; upstream
//! iteration (producing the thunks) is always single-threaded.

use std::ops::ControlFlow;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::executor::Executor;

type Thunk<T> = Box<dyn FnOnce() -> Option<T> + Send>;

pub struct Stream<T> {
    items: Box<dyn Iterator<Item = Thunk<T>> + Send>,
    parallel: bool,
}

impl<T: Send + 'static> Stream<T> {
    pub fn from_iter<I>(iter: I) -> Stream<T>
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        Stream {
            items: Box::new(iter.map(|x| Box::new(move || Some(x)) as Thunk<T>)),
            parallel: false,
        }
    }

    pub fn from_vec(items: Vec<T>) -> Stream<T> {
        Self::from_iter(items.into_iter())
    }

    pub fn map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Stream {
            items: Box::new(self.items.map(move |thunk| {
                let f = Arc::clone(&f);
                Box::new(move || thunk().map(|x| (*f)(x))) as Thunk<U>
            })),
            parallel: self.parallel,
        }
    }

    pub fn filter<P>(self, pred: P) -> Stream<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let pred = Arc::new(pred);
        Stream {
            items: Box::new(self.items.map(move |thunk| {
                let pred = Arc::clone(&pred);
                Box::new(move || thunk().filter(|x| (*pred)(x))) as Thunk<T>
            })),
            parallel: self.parallel,
        }
    }

    /// Evaluate element thunks on the executor from here on. Takes
    /// effect at `collect`; `foreach` stays sequential.
    pub fn parallel(mut self) -> Stream<T> {
        self.parallel = true;
        self
    }

    /// Sequential terminal loop.
    pub fn foreach(self, mut f: impl FnMut(T)) {
        for thunk in self.items {
            if let Some(x) = thunk() {
                f(x);
            }
        }
    }

    /// Sequential terminal loop with early stop.
    pub fn foreach_while(self, mut f: impl FnMut(T) -> ControlFlow<()>) {
        for thunk in self.items {
            if let Some(x) = thunk() {
                if f(x).is_break() {
                    break;
                }
            }
        }
    }

    /// Ordered terminal collection. On a parallel stream every thunk is
    /// submitted to the default pool and the results land in their
    /// input slots.
    pub fn collect(self) -> Vec<T> {
        if !self.parallel {
            return self.items.filter_map(|thunk| thunk()).collect();
        }
        let pool = Executor::default_pool();
        let slots: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new(Vec::new()));
        let mut futures = Vec::new();
        for (index, thunk) in self.items.enumerate() {
            slots.lock().push(None);
            let slots = Arc::clone(&slots);
            futures.push(pool.submit(move || {
                let value = thunk();
                slots.lock()[index] = value;
            }));
        }
        for future in &futures {
            future.wait();
        }
        let slots = Arc::try_unwrap(slots)
            .unwrap_or_else(|_| panic!("dangling result slot"))
            .into_inner();
        slots.into_iter().flatten().collect()
    }
}
