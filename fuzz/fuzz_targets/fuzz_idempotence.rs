#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::{arbitrary, fuzz_target};
use niltoempty::{Record, Type, Value, normalize, to_json_value};

const MAX_DEPTH: usize = 8;
const MAX_LEN: usize = 8;

#[derive(Arbitrary, Debug)]
struct FuzzValue {
    choice: u8,
}

impl FuzzValue {
    fn to_value(&self, u: &mut arbitrary::Unstructured, depth: usize) -> arbitrary::Result<Value> {
        if depth >= MAX_DEPTH {
            return Ok(Value::untyped_nil());
        }

        Ok(match self.choice % 14 {
            0 => Value::untyped_nil(),
            1 => Value::from(u.arbitrary::<bool>()?),
            2 => Value::from(u.arbitrary::<i64>()?),
            3 => Value::from(u.arbitrary::<String>()?),
            4 => Value::nil_slice(Type::Any),
            5 => Value::nil_map(Type::String, Type::Any),
            6 => Value::nil_ptr(Type::Any),
            7 => Value::dynamic(Self::child(u, depth)?),
            8 => Value::ptr(Self::child(u, depth)?),
            9 => {
                let len = u.int_in_range(0..=MAX_LEN)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Self::child(u, depth)?);
                }
                Value::slice(Type::Any, items)
            }
            10 => {
                let len = u.int_in_range(0..=MAX_LEN)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Self::child(u, depth)?);
                }
                Value::array(Type::Any, items)
            }
            11 => {
                let len = u.int_in_range(0..=MAX_LEN)?;
                let mut entries = Vec::with_capacity(len);
                for _ in 0..len {
                    let key: String = u.arbitrary()?;
                    entries.push((key, Self::child(u, depth)?));
                }
                Value::map(Type::String, Type::Any, entries)
            }
            _ => {
                let len = u.int_in_range(0..=MAX_LEN)?;
                let mut record = Record::new("Fuzz");
                for i in 0..len {
                    let value = Self::child(u, depth)?;
                    record = if u.arbitrary::<bool>()? {
                        record.field(format!("f{}", i), value)
                    } else {
                        record.internal(format!("f{}", i), value)
                    };
                }
                Value::from(record)
            }
        })
    }

    fn child(u: &mut arbitrary::Unstructured, depth: usize) -> arbitrary::Result<Value> {
        let fv: FuzzValue = u.arbitrary()?;
        fv.to_value(u, depth + 1)
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = arbitrary::Unstructured::new(data);

    if let Ok(fv) = u.arbitrary::<FuzzValue>() {
        if let Ok(value) = fv.to_value(&mut u, 0) {
            let mut root = Value::ptr(value);
            let once = to_json_value(normalize(&mut root)).unwrap();
            let twice = to_json_value(normalize(&mut root)).unwrap();
            if once != twice {
                panic!(
                    "Normalization is not idempotent!\nFirst: {}\nSecond: {}",
                    serde_json::to_string_pretty(&once).unwrap(),
                    serde_json::to_string_pretty(&twice).unwrap()
                );
            }
        }
    }
});
