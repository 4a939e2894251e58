#![no_main]
use libfuzzer_sys::{arbitrary, fuzz_target};
use niltoempty::{Map, Slice, Type, Value, normalize};

const MAX_NODES: usize = 16;

// Builds a pool of shared slices and maps and wires them to each other at
// random, so the graph is usually cyclic. The walk must terminate.
fuzz_target!(|data: &[u8]| {
    let mut u = arbitrary::Unstructured::new(data);
    let Ok(count) = u.int_in_range(1..=MAX_NODES) else {
        return;
    };

    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        let node = if i % 2 == 0 {
            Value::Slice(Slice::new(Type::Any, Vec::new()))
        } else {
            Value::Map(Map::new(Type::String, Type::Any, Vec::<(String, Value)>::new()))
        };
        nodes.push(node);
    }

    while let Ok(true) = u.arbitrary::<bool>() {
        let (Ok(from), Ok(to)) = (u.choose_index(count), u.choose_index(count)) else {
            break;
        };
        let edge = match u.int_in_range(0..=3u8) {
            Ok(0) => Value::dynamic(Value::nil_slice(Type::Int)),
            Ok(1) => Value::dynamic(Value::nil_map(Type::String, Type::Int)),
            Ok(2) => Value::untyped_nil(),
            _ => Value::dynamic(nodes[to].clone()),
        };
        match &nodes[from] {
            Value::Slice(slice) => {
                if let Some(items) = slice.items() {
                    items.borrow_mut().push(edge);
                }
            }
            Value::Map(map) => {
                map.insert(format!("k{}", to), edge);
            }
            _ => {}
        }
    }

    let mut root = Value::ptr(nodes[0].clone());
    normalize(&mut root);
});
