/// True when `num` voters out of `total` form a quorum
pub(crate) fn is_majority(
    num: usize,
    total: usize,
) -> bool {
    num > total / 2
}
