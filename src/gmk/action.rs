//! Drag-and-drop action lists shared by object events and timeline moments.
use crate::gmk::Layout;
use crate::gmk::project::{ACTION_ARGUMENT_SLOTS, Action, Moment, ObjectEvent};
use crate::gmk::stream::GmkStream;
use crate::types::GmkError;
use anyhow::Result;

pub const ACTION_MARKER: u32 = 440;
pub const ACTION_LIST_MARKER: u32 = 400;
/// Tag that closes one event bucket.
pub const EVENT_SENTINEL: u32 = 0xFFFFFFFF;

fn read_argument_count(stream: &mut GmkStream, layout: Layout, what: &str) -> Result<usize> {
    let count = stream.read_u32()?;
    match layout {
        // Compiled games always carry every slot.
        Layout::Executable => Ok(ACTION_ARGUMENT_SLOTS),
        Layout::Archive if count as usize > ACTION_ARGUMENT_SLOTS => Err(GmkError::InvalidData(
            format!("action declares {} argument {}", count, what),
        )
        .into()),
        Layout::Archive => Ok(count as usize),
    }
}

pub fn read_action(stream: &mut GmkStream, layout: Layout) -> Result<Action> {
    stream.skip_fields(1)?;
    let mut action = Action {
        library_id: stream.read_u32()?,
        action_id: stream.read_u32()?,
        kind: stream.read_u32()?,
        may_be_relative: stream.read_bool()?,
        question: stream.read_bool()?,
        applies_to_something: stream.read_bool()?,
        exec_type: stream.read_u32()?,
        function_name: stream.read_string()?,
        function_code: stream.read_string()?,
        arguments_used: stream.read_u32()?,
        ..Default::default()
    };
    let kinds = read_argument_count(stream, layout, "kinds")?;
    for slot in action.argument_kinds.iter_mut().take(kinds) {
        *slot = stream.read_u32()?;
    }
    action.applies_to = stream.read_i32()?;
    action.relative = stream.read_bool()?;
    let values = read_argument_count(stream, layout, "values")?;
    for slot in action.argument_values.iter_mut().take(values) {
        *slot = stream.read_string()?;
    }
    action.negate = stream.read_bool()?;
    Ok(action)
}

/// Always writes all eight argument slots.
pub fn write_action(action: &Action, stream: &mut GmkStream) {
    stream.write_u32(ACTION_MARKER);
    stream.write_u32(action.library_id);
    stream.write_u32(action.action_id);
    stream.write_u32(action.kind);
    stream.write_bool(action.may_be_relative);
    stream.write_bool(action.question);
    stream.write_bool(action.applies_to_something);
    stream.write_u32(action.exec_type);
    stream.write_string(&action.function_name);
    stream.write_string(&action.function_code);
    stream.write_u32(action.arguments_used);
    stream.write_u32(ACTION_ARGUMENT_SLOTS as u32);
    for kind in action.argument_kinds {
        stream.write_u32(kind);
    }
    stream.write_i32(action.applies_to);
    stream.write_bool(action.relative);
    stream.write_u32(ACTION_ARGUMENT_SLOTS as u32);
    for value in &action.argument_values {
        stream.write_string(value);
    }
    stream.write_bool(action.negate);
}

/// `[marker][count][actions…]`
pub fn read_action_list(stream: &mut GmkStream, layout: Layout) -> Result<Vec<Action>> {
    stream.skip_fields(1)?;
    let count = stream.read_u32()? as usize;
    let mut actions = Vec::with_capacity(count.min(stream.remaining() / 4));
    for _ in 0..count {
        actions.push(read_action(stream, layout)?);
    }
    Ok(actions)
}

pub fn write_action_list(actions: &[Action], stream: &mut GmkStream) {
    stream.write_u32(ACTION_LIST_MARKER);
    stream.write_u32(actions.len() as u32);
    for action in actions {
        write_action(action, stream);
    }
}

/// Reads `[last bucket index]`, then for every bucket `(tag, action list)` pairs up to
/// [`EVENT_SENTINEL`].
pub fn read_object_events(
    stream: &mut GmkStream,
    layout: Layout,
) -> Result<Vec<Vec<ObjectEvent>>> {
    let buckets = stream.read_u32()? as usize + 1;
    let mut events = Vec::with_capacity(buckets.min(stream.remaining() / 4));
    for _ in 0..buckets {
        let mut bucket = Vec::new();
        loop {
            let kind = stream.read_u32()?;
            if kind == EVENT_SENTINEL {
                break;
            }
            bucket.push(ObjectEvent {
                kind,
                actions: read_action_list(stream, layout)?,
            });
        }
        events.push(bucket);
    }
    Ok(events)
}

/// Every bucket is closed with the sentinel, including empty ones. A model without buckets
/// still writes one empty bucket since the count cannot express zero.
pub fn write_object_events(events: &[Vec<ObjectEvent>], stream: &mut GmkStream) {
    let buckets = events.len().max(1);
    stream.write_u32(buckets as u32 - 1);
    for i in 0..buckets {
        for event in events.get(i).map(Vec::as_slice).unwrap_or_default() {
            stream.write_u32(event.kind);
            write_action_list(&event.actions, stream);
        }
        stream.write_u32(EVENT_SENTINEL);
    }
}

/// `[count]` then per moment `[position][action list]`.
pub fn read_moments(stream: &mut GmkStream, layout: Layout) -> Result<Vec<Moment>> {
    let count = stream.read_u32()? as usize;
    let mut moments = Vec::with_capacity(count.min(stream.remaining() / 4));
    for _ in 0..count {
        let position = stream.read_u32()?;
        moments.push(Moment {
            position,
            actions: read_action_list(stream, layout)?,
        });
    }
    Ok(moments)
}

pub fn write_moments(moments: &[Moment], stream: &mut GmkStream) {
    stream.write_u32(moments.len() as u32);
    for moment in moments {
        stream.write_u32(moment.position);
        write_action_list(&moment.actions, stream);
    }
}
