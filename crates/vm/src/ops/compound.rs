//! Compound-type operations: arrays, structs and maps.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::ops::pop_index;
use crate::stack_item::StackItem;

fn check_array_size(engine: &ExecutionEngine, operation: &str, size: usize) -> VmResult<()> {
    let limit = engine.limits().max_array_size;
    if size > limit {
        return Err(VmError::invalid_operation(
            operation.to_string(),
            format!("array size {size} exceeds limit {limit}"),
        ));
    }
    Ok(())
}

/// Pushes the element count of a collection, or the byte length of a
/// primitive item.
pub(crate) fn array_size(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.evaluation_stack_mut().pop()?;
    let size = match &item {
        StackItem::Array(items) | StackItem::Struct(items) => {
            items.lock().len()
        }
        StackItem::Map(entries) => entries.lock().len(),
        other => other.as_bytes()?.len(),
    };
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_int(size as i64));
    Ok(())
}

/// Pops `n` then `n` items into a new array; the first popped item becomes
/// element 0.
pub(crate) fn pack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = pop_index(engine, "PACK")?;
    check_array_size(engine, "PACK", count)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(engine.evaluation_stack_mut().pop()?);
    }
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_array(items));
    Ok(())
}

/// Pushes the elements of an array (last element first) followed by the
/// element count.
pub(crate) fn unpack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let items = engine.evaluation_stack_mut().pop()?.as_items()?;
    let count = items.len();
    for item in items.into_iter().rev() {
        engine.evaluation_stack_mut().push(item);
    }
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_int(count as i64));
    Ok(())
}

pub(crate) fn pick_item(engine: &mut ExecutionEngine) -> VmResult<()> {
    let key = engine.evaluation_stack_mut().pop()?;
    let collection = engine.evaluation_stack_mut().pop()?;
    let value = match &collection {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let items = items.lock();
            let index = item_index(&key, items.len(), "PICKITEM")?;
            items[index].clone()
        }
        StackItem::Map(entries) => entries
            .lock()
            .iter()
            .find(|(k, _)| k.equals(&key))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                VmError::invalid_operation("PICKITEM".to_string(), format!("missing key {key:?}"))
            })?,
        other => return Err(VmError::invalid_type(other.type_name(), "Array")),
    };
    engine.evaluation_stack_mut().push(value);
    Ok(())
}

/// Stores a value into a collection. Struct values are copied in.
pub(crate) fn set_item(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.evaluation_stack_mut().pop()?;
    let value = match &value {
        StackItem::Struct(_) => value.deep_copy(),
        _ => value,
    };
    let key = engine.evaluation_stack_mut().pop()?;
    let collection = engine.evaluation_stack_mut().pop()?;
    match &collection {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let mut items = items.lock();
            let index = item_index(&key, items.len(), "SETITEM")?;
            items[index] = value;
        }
        StackItem::Map(entries) => {
            if key.is_collection() {
                return Err(VmError::invalid_type(key.type_name(), "map key"));
            }
            let mut entries = entries.lock();
            match entries.iter_mut().find(|(k, _)| k.equals(&key)) {
                Some((_, existing)) => *existing = value,
                None => entries.push((key, value)),
            }
        }
        other => return Err(VmError::invalid_type(other.type_name(), "Array")),
    }
    Ok(())
}

pub(crate) fn new_array(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = pop_index(engine, "NEWARRAY")?;
    check_array_size(engine, "NEWARRAY", count)?;
    let items = vec![StackItem::from_bool(false); count];
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_array(items));
    Ok(())
}

pub(crate) fn new_struct(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = pop_index(engine, "NEWSTRUCT")?;
    check_array_size(engine, "NEWSTRUCT", count)?;
    let items = vec![StackItem::from_bool(false); count];
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_struct(items));
    Ok(())
}

pub(crate) fn new_map(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.evaluation_stack_mut().push(StackItem::new_map());
    Ok(())
}

/// Appends a value to an array or struct. Struct values are copied in.
pub(crate) fn append(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.evaluation_stack_mut().pop()?;
    let value = match &value {
        StackItem::Struct(_) => value.deep_copy(),
        _ => value,
    };
    let collection = engine.evaluation_stack_mut().pop()?;
    match &collection {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let mut items = items.lock();
            check_array_size(engine, "APPEND", items.len() + 1)?;
            items.push(value);
        }
        other => return Err(VmError::invalid_type(other.type_name(), "Array")),
    }
    Ok(())
}

pub(crate) fn reverse(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.evaluation_stack_mut().pop()?;
    match &collection {
        StackItem::Array(items) | StackItem::Struct(items) => {
            items.lock().reverse();
            Ok(())
        }
        other => Err(VmError::invalid_type(other.type_name(), "Array")),
    }
}

pub(crate) fn remove(engine: &mut ExecutionEngine) -> VmResult<()> {
    let key = engine.evaluation_stack_mut().pop()?;
    let collection = engine.evaluation_stack_mut().pop()?;
    match &collection {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let mut items = items.lock();
            let index = item_index(&key, items.len(), "REMOVE")?;
            items.remove(index);
            Ok(())
        }
        StackItem::Map(entries) => {
            let mut entries = entries.lock();
            entries.retain(|(k, _)| !k.equals(&key));
            Ok(())
        }
        other => Err(VmError::invalid_type(other.type_name(), "Array")),
    }
}

pub(crate) fn has_key(engine: &mut ExecutionEngine) -> VmResult<()> {
    let key = engine.evaluation_stack_mut().pop()?;
    let collection = engine.evaluation_stack_mut().pop()?;
    let found = match &collection {
        StackItem::Array(items) | StackItem::Struct(items) => {
            let len = items.lock().len();
            let index = key.as_int()?;
            if index.sign() == num_bigint::Sign::Minus {
                return Err(VmError::invalid_operation(
                    "HASKEY".to_string(),
                    format!("negative index {index}"),
                ));
            }
            index < num_bigint::BigInt::from(len)
        }
        StackItem::Map(entries) => entries
            .lock()
            .iter()
            .any(|(k, _)| k.equals(&key)),
        other => return Err(VmError::invalid_type(other.type_name(), "Array")),
    };
    engine.evaluation_stack_mut().push(StackItem::from_bool(found));
    Ok(())
}

pub(crate) fn keys(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.evaluation_stack_mut().pop()?;
    match &collection {
        StackItem::Map(entries) => {
            let keys = entries
                .lock()
                .iter()
                .map(|(k, _)| k.clone())
                .collect();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_array(keys));
            Ok(())
        }
        other => Err(VmError::invalid_type(other.type_name(), "Map")),
    }
}

pub(crate) fn values(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.evaluation_stack_mut().pop()?;
    match &collection {
        StackItem::Map(entries) => {
            let values = entries
                .lock()
                .iter()
                .map(|(_, v)| v.clone())
                .collect();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_array(values));
            Ok(())
        }
        other => Err(VmError::invalid_type(other.type_name(), "Map")),
    }
}

fn item_index(key: &StackItem, len: usize, operation: &str) -> VmResult<usize> {
    use num_traits::ToPrimitive;
    let index = key.as_int()?;
    let index = index.to_usize().ok_or_else(|| {
        VmError::invalid_operation(operation.to_string(), format!("invalid index {index}"))
    })?;
    if index >= len {
        return Err(VmError::invalid_operation(
            operation.to_string(),
            format!("index {index} out of range {len}"),
        ));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use crate::execution_engine::ExecutionEngine;
    use crate::interop_service::InteropService;
    use num_bigint::BigInt;

    fn run_script(script: Vec<u8>) -> ExecutionEngine {
        let mut engine = ExecutionEngine::new(InteropService::new());
        engine.load_script(script).unwrap();
        while !engine.state().is_halt() && !engine.state().is_fault() {
            engine.step_into();
        }
        engine
    }

    fn top_int(engine: &ExecutionEngine) -> BigInt {
        engine.evaluation_stack().peek(0).unwrap().as_int().unwrap()
    }

    #[test]
    fn test_pack_preserves_order() {
        // PUSH1 PUSH2 PUSH3 PUSH3 PACK, PUSH0 PICKITEM RET
        // First popped item (3) becomes element 0.
        let engine = run_script(vec![0x51, 0x52, 0x53, 0x53, 0xC1, 0x00, 0xC3, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(3));
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        // PUSH1 PUSH2 PUSH2 PACK UNPACK RET -> count on top, then elements
        let engine = run_script(vec![0x51, 0x52, 0x52, 0xC1, 0xC2, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(2));
        assert_eq!(
            engine.evaluation_stack().peek(1).unwrap().as_int().unwrap(),
            BigInt::from(2)
        );
        assert_eq!(
            engine.evaluation_stack().peek(2).unwrap().as_int().unwrap(),
            BigInt::from(1)
        );
    }

    #[test]
    fn test_newarray_setitem_pickitem() {
        // PUSH2 NEWARRAY DUP PUSH0 PUSH7 SETITEM PUSH0 PICKITEM RET
        let engine = run_script(vec![
            0x52, 0xC5, 0x76, 0x00, 0x57, 0xC4, 0x00, 0xC3, 0x66,
        ]);
        assert!(engine.state().is_halt());
        assert_eq!(top_int(&engine), BigInt::from(7));
    }

    #[test]
    fn test_append_through_dup() {
        // PUSH0 NEWARRAY DUP PUSH5 APPEND ARRAYSIZE RET
        let engine = run_script(vec![0x00, 0xC5, 0x76, 0x55, 0xC8, 0xC0, 0x66]);
        assert!(engine.state().is_halt());
        assert_eq!(top_int(&engine), BigInt::from(1));
    }

    #[test]
    fn test_arraysize_of_byte_array() {
        // PUSHBYTES3 ... ARRAYSIZE RET
        let engine = run_script(vec![0x03, 0x01, 0x02, 0x03, 0xC0, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(3));
    }

    #[test]
    fn test_map_set_get_haskey() {
        // NEWMAP DUP PUSH1 PUSH7 SETITEM DUP PUSH1 HASKEY TOALTSTACK
        // PUSH1 PICKITEM RET
        let engine = run_script(vec![
            0xC7, 0x76, 0x51, 0x57, 0xC4, 0x76, 0x51, 0xCB, 0x6B, 0x51, 0xC3, 0x66,
        ]);
        assert!(engine.state().is_halt());
        assert_eq!(top_int(&engine), BigInt::from(7));
        assert!(engine.alt_stack().peek(0).unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_pickitem_out_of_range_faults() {
        // PUSH1 NEWARRAY PUSH5 PICKITEM
        let engine = run_script(vec![0x51, 0xC5, 0x55, 0xC3]);
        assert!(engine.state().is_fault());
    }

    #[test]
    fn test_reverse_and_remove() {
        // PUSH1 PUSH2 PUSH3 PUSH3 PACK DUP REVERSE PUSH0 PICKITEM RET
        // Packed array is [3,2,1]; reversed [1,2,3]; element 0 is 1.
        let engine = run_script(vec![
            0x51, 0x52, 0x53, 0x53, 0xC1, 0x76, 0xC9, 0x00, 0xC3, 0x66,
        ]);
        assert_eq!(top_int(&engine), BigInt::from(1));

        // PUSH1 PUSH2 PUSH2 PACK DUP PUSH0 REMOVE ARRAYSIZE RET
        let engine = run_script(vec![0x51, 0x52, 0x52, 0xC1, 0x76, 0x00, 0xCA, 0xC0, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(1));
    }
}
