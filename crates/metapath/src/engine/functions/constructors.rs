use crate::engine::error::Error;
use crate::model::MetapathNode;
use crate::xdm::{AtomicType, Sequence};

use super::common::opt_atomic;

/// `xs:T($arg)`: cast the optional atomized argument to `target`.
pub(super) fn construct<N: MetapathNode>(target: AtomicType, args: &[Sequence<N>]) -> Result<Sequence<N>, Error> {
    let Some(value) = opt_atomic(&args[0]) else {
        return Ok(Sequence::empty());
    };
    Ok(Sequence::from(target.cast(value)?))
}
