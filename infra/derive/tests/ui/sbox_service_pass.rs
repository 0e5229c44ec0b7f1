use std::sync::Arc;

#[sbox_derive::sbox_service]
pub struct Counter {
    name: String,
    shared: Arc<Vec<u32>>,
}

fn main() {
    let counter = Counter::new(CounterInner { name: "hits".to_owned(), shared: Arc::new(vec![1]) });
    let copy = counter.clone();
    assert_eq!(copy.name, "hits");
    assert_eq!(copy.shared.len(), 1);
}
