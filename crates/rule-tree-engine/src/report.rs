//! 结果快照
//!
//! 供宿主程序展示或序列化的只读结果树。

use serde::Serialize;

use crate::models::{ErrorValue, Status};
use crate::node::Node;

/// 节点结果快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// 深度优先收集指定状态的节点 id
    pub fn ids_with_status(&self, status: Status) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut pending = vec![self];
        while let Some(snapshot) = pending.pop() {
            if snapshot.status == status {
                ids.push(snapshot.id.as_str());
            }
            pending.extend(snapshot.children.iter().rev());
        }
        ids
    }
}

impl Drop for NodeSnapshot {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut snapshot) = pending.pop() {
            pending.append(&mut snapshot.children);
        }
    }
}

impl<C> Node<C> {
    /// 当前整棵子树结果的快照
    pub fn snapshot(&self) -> NodeSnapshot {
        let mut stack = vec![(self.shallow_snapshot(), self.children().into_iter())];

        while let Some((_, children)) = stack.last_mut() {
            if let Some(child) = children.next() {
                stack.push((child.shallow_snapshot(), child.children().into_iter()));
                continue;
            }

            let Some((done, _)) = stack.pop() else { break };
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(done),
                None => return done,
            }
        }

        self.shallow_snapshot()
    }

    fn shallow_snapshot(&self) -> NodeSnapshot {
        let result = self.result();
        NodeSnapshot {
            id: self.id().to_string(),
            description: self.description().map(str::to_string),
            status: result.status(),
            error: result.error().cloned(),
            children: Vec::new(),
        }
    }
}
