use crate::debugger::protocol::{FrameKey, FrameRecord, VariableId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct FrameState {
    line: u32,
    index: usize,
    variables: Vec<VariableId>,
}

/// Stack frame of a suspended debugee.
///
/// Frame objects live across stack refreshes: a frame that represents the same call as a frame
/// from the previous refresh is the same object with updated line, index and variables.
#[derive(Debug)]
pub struct StackFrame {
    key: FrameKey,
    file: Option<String>,
    name: String,
    state: Mutex<FrameState>,
}

impl StackFrame {
    fn new(record: FrameRecord, index: usize) -> Self {
        Self {
            key: record.key,
            file: record.file,
            name: record.name,
            state: Mutex::new(FrameState {
                line: record.line,
                index,
                variables: record.variables,
            }),
        }
    }

    fn update(&self, record: FrameRecord, index: usize) {
        let mut state = self.state.lock().unwrap();
        state.line = record.line;
        state.index = index;
        state.variables = record.variables;
    }

    pub fn key(&self) -> &FrameKey {
        &self.key
    }

    /// Stylesheet file url, if debugee reports it.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_number(&self) -> u32 {
        self.state.lock().unwrap().line
    }

    /// Position of the frame in the last fetched stack.
    pub fn index(&self) -> usize {
        self.state.lock().unwrap().index
    }

    pub fn variables(&self) -> Vec<VariableId> {
        self.state.lock().unwrap().variables.clone()
    }

    /// Frame name for presentation: stylesheet file name followed by the template name.
    pub fn display_name(&self) -> String {
        match self.file.as_deref().and_then(|f| f.rsplit('/').next()) {
            Some(file) if !file.is_empty() => format!("{file} {}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Cache of the current debugee stack.
#[derive(Default)]
pub struct FrameCache {
    frames: Vec<Arc<StackFrame>>,
}

impl FrameCache {
    pub fn frames(&self) -> &[Arc<StackFrame>] {
        &self.frames
    }

    /// Replace cached stack, reusing frames with matching keys.
    pub fn refresh(&mut self, records: Vec<FrameRecord>) -> Vec<Arc<StackFrame>> {
        let mut previous: HashMap<FrameKey, Arc<StackFrame>> = self
            .frames
            .drain(..)
            .map(|f| (f.key.clone(), f))
            .collect();

        self.frames = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| match previous.remove(&record.key) {
                Some(frame) => {
                    frame.update(record, index);
                    frame
                }
                None => Arc::new(StackFrame::new(record, index)),
            })
            .collect();

        self.frames.clone()
    }
}
