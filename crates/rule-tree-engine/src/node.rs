//! 校验节点与树结构
//!
//! `Node` 是一个可廉价克隆的句柄（内部为 `Arc`）。所有权严格从父节点流向子节点，
//! 父节点引用是 `Weak`，仅用于诊断（路径、重复挂载检测），不影响生命周期。

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::{Result, RuleError};
use crate::models::{Status, ValidationResult};
use crate::rule_spec::RuleSpec;

struct NodeInner<C> {
    spec: RuleSpec<C>,
    children: RwLock<Vec<Node<C>>>,
    parent: RwLock<Weak<NodeInner<C>>>,
    result: RwLock<ValidationResult>,
}

/// 校验节点
///
/// 同一节点的结果字段在多次 `validate` 之间共享，
/// 对同一节点并发执行 `validate` 会互相覆盖结果，调用方需要自行避免。
pub struct Node<C> {
    inner: Arc<NodeInner<C>>,
}

impl<C> Clone for Node<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> Node<C> {
    /// 由节点描述创建节点
    pub fn new(spec: RuleSpec<C>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                spec,
                children: RwLock::new(Vec::new()),
                parent: RwLock::new(Weak::new()),
                result: RwLock::new(ValidationResult::none()),
            }),
        }
    }

    /// 创建节点并作为最后一个子节点挂载，返回自身以便链式调用
    pub fn add_rule(&self, spec: RuleSpec<C>) -> &Self {
        let child = Node::new(spec);
        *child.inner.parent.write() = Arc::downgrade(&self.inner);
        self.inner.children.write().push(child);
        self
    }

    /// 挂载已有节点作为最后一个子节点，返回自身以便链式调用
    ///
    /// 已经挂载在其它（仍存活的）父节点下的节点会被拒绝；
    /// 挂载自身或祖先节点同样会被拒绝，以保证结构始终是一棵树。
    pub fn add_child(&self, child: Node<C>) -> Result<&Self> {
        if let Some(parent) = child.parent() {
            return Err(RuleError::AlreadyAttached {
                child: child.id().to_string(),
                parent: parent.id().to_string(),
            });
        }

        if self.ancestors_and_self().any(|node| node.ptr_eq(&child)) {
            return Err(RuleError::CyclicAttachment {
                child: child.id().to_string(),
                parent: self.id().to_string(),
            });
        }

        *child.inner.parent.write() = Arc::downgrade(&self.inner);
        self.inner.children.write().push(child);
        Ok(self)
    }

    pub fn id(&self) -> &str {
        self.inner.spec.id()
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.spec.get_description()
    }

    pub fn spec(&self) -> &RuleSpec<C> {
        &self.inner.spec
    }

    /// 当前结果（快照）
    pub fn result(&self) -> ValidationResult {
        self.inner.result.read().clone()
    }

    pub fn status(&self) -> Status {
        self.inner.result.read().status()
    }

    /// 子节点列表（按插入顺序，即评估顺序）
    pub fn children(&self) -> Vec<Node<C>> {
        self.inner.children.read().clone()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.read().len()
    }

    /// 父节点（父节点已被释放时为 `None`）
    pub fn parent(&self) -> Option<Node<C>> {
        self.inner
            .parent
            .read()
            .upgrade()
            .map(|inner| Node { inner })
    }

    /// 是否为同一个节点
    pub fn ptr_eq(&self, other: &Node<C>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 从根到本节点的路径，如 `loan/applicant/adult`
    pub fn path(&self) -> String {
        let mut ids: Vec<String> = self
            .ancestors_and_self()
            .map(|node| node.id().to_string())
            .collect();
        ids.reverse();
        ids.join("/")
    }

    /// 深度优先查找 id 匹配的节点（包括自身）
    pub fn find(&self, id: &str) -> Option<Node<C>> {
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            if node.id() == id {
                return Some(node);
            }
            pending.extend(node.children().into_iter().rev());
        }
        None
    }

    /// 将整棵子树的结果重置为 `none`（不通知观察者）
    pub(crate) fn reset_subtree(&self) {
        let mut pending = vec![self.clone()];
        while let Some(node) = pending.pop() {
            *node.inner.result.write() = ValidationResult::none();
            pending.extend(node.children());
        }
    }

    /// 在写锁内根据当前结果计算新结果，返回 (旧状态, 新结果)
    pub(crate) fn update_result<F>(&self, f: F) -> (Status, ValidationResult)
    where
        F: FnOnce(&ValidationResult) -> Option<ValidationResult>,
    {
        let mut guard = self.inner.result.write();
        let previous = guard.status();
        if let Some(next) = f(&guard) {
            *guard = next;
        }
        (previous, guard.clone())
    }

    fn ancestors_and_self(&self) -> impl Iterator<Item = Node<C>> + use<C> {
        std::iter::successors(Some(self.clone()), |node| node.parent())
    }
}

impl<C> Drop for NodeInner<C> {
    // 逐层拆解子树，深树释放时不递归
    fn drop(&mut self) {
        let mut pending = std::mem::take(self.children.get_mut());
        while let Some(Node { inner }) = pending.pop() {
            if let Ok(mut inner) = Arc::try_unwrap(inner) {
                pending.append(inner.children.get_mut());
            }
        }
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("status", &self.status())
            .field("children", &self.child_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> Node<()> {
        Node::new(RuleSpec::new(id))
    }

    #[test]
    fn test_new_node_starts_with_none() {
        let root = node("root");
        assert_eq!(root.id(), "root");
        assert_eq!(root.status(), Status::None);
        assert!(root.parent().is_none());
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn test_add_rule_preserves_order_and_chains() {
        let root = node("root");
        root.add_rule(RuleSpec::new("a"))
            .add_rule(RuleSpec::new("b").description("second"))
            .add_rule(RuleSpec::new("c"));

        let ids: Vec<String> = root.children().iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(root.children()[1].description(), Some("second"));
        assert!(root.children()[0].parent().unwrap().ptr_eq(&root));
    }

    #[test]
    fn test_add_child_sets_parent() {
        let root = node("root");
        let child = node("child");
        root.add_child(child.clone()).unwrap().add_child(node("other")).unwrap();

        assert!(child.parent().unwrap().ptr_eq(&root));
        assert_eq!(root.child_count(), 2);
        assert_eq!(child.path(), "root/child");
    }

    #[test]
    fn test_reattach_is_rejected() {
        let first = node("first");
        let second = node("second");
        let child = node("child");
        first.add_child(child.clone()).unwrap();

        let err = second.add_child(child.clone()).unwrap_err();
        assert!(matches!(err, RuleError::AlreadyAttached { .. }));
        assert!(child.parent().unwrap().ptr_eq(&first));
        assert_eq!(second.child_count(), 0);
    }

    #[test]
    fn test_attach_after_parent_dropped() {
        let child = node("child");
        {
            let temporary = node("temporary");
            temporary.add_child(child.clone()).unwrap();
        }
        assert!(child.parent().is_none());

        let root = node("root");
        assert!(root.add_child(child.clone()).is_ok());
        assert!(child.parent().unwrap().ptr_eq(&root));
    }

    #[test]
    fn test_cyclic_attach_is_rejected() {
        let root = node("root");
        let mid = node("mid");
        root.add_child(mid.clone()).unwrap();

        assert!(matches!(
            mid.add_child(root.clone()),
            Err(RuleError::CyclicAttachment { .. })
        ));
        assert!(matches!(
            root.add_child(root.clone()),
            Err(RuleError::CyclicAttachment { .. })
        ));
    }

    #[test]
    fn test_find_and_path() {
        let root = node("loan");
        let applicant = node("applicant");
        applicant.add_rule(RuleSpec::new("adult"));
        root.add_child(applicant).unwrap();

        let adult = root.find("adult").unwrap();
        assert_eq!(adult.path(), "loan/applicant/adult");
        assert!(root.find("missing").is_none());
    }
}
