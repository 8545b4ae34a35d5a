use super::*;

#[test]
fn test_node() {
    let node = Node::new("0001.a", 'x', 0, false);
    assert_eq!(node.id, "0001.a");
    assert_eq!(node.value, 'x');
    assert_eq!(node.parent, Some(0));
    assert_eq!(node.is_left_child, false);
    assert_eq!(node.is_present, true);
    assert_eq!(node.is_root(), false);
    assert_eq!(node.b_count, 0);
    assert_eq!(node.b_factor, 0);
    assert_eq!(node.salm(Side::Left).height, 0);
    assert_eq!(node.salm(Side::Right).height, 0);
    assert_eq!(node.children(true).len(), 0);
    assert_eq!(node.children(false).len(), 0);
}

#[test]
fn test_root_node() {
    let mut root = Node::new_root();
    assert_eq!(root.id, ROOT_ID);
    assert_eq!(root.is_root(), true);
    assert_eq!(root.is_present, false);
    assert_eq!(root.parent, None);

    root.salm_mut(Side::Right).right = Some(1);
    assert_eq!(root.rsalm.right, Some(1));
    assert_eq!(root.lsalm.right, None);
}
