//! Registration of the standard function library.

use tracing::error;

use super::{
    CallContext, FunctionBuilder, FunctionLibrary, ItemType, SequenceType, boolean, constructors, datetime, documents, nodes,
    numeric, sequences, strings,
};
use crate::consts::{FNS, XS};
use crate::engine::error::Error;
use crate::engine::functions::Function;
use crate::model::MetapathNode;
use crate::xdm::{AtomicType, ExpandedName, Sequence};

type Body<N> = fn(&CallContext<'_, N>, &[Sequence<N>]) -> Result<Sequence<N>, Error>;

const ITEMS: SequenceType = SequenceType::zero_or_more(ItemType::Item);
const ITEM_OPT: SequenceType = SequenceType::optional(ItemType::Item);
const ITEM: SequenceType = SequenceType::one(ItemType::Item);
const ITEMS_PLUS: SequenceType = SequenceType::one_or_more(ItemType::Item);
const NODE_OPT: SequenceType = SequenceType::optional(ItemType::Node);
const NODE: SequenceType = SequenceType::one(ItemType::Node);
const ATOMICS: SequenceType = SequenceType::zero_or_more(ItemType::AnyAtomic);
const ATOMIC_OPT: SequenceType = SequenceType::optional(ItemType::AnyAtomic);
const STRING: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::String));
const STRING_OPT: SequenceType = SequenceType::optional(ItemType::Atomic(AtomicType::String));
const BOOLEAN: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::Boolean));
const INTEGER: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::Integer));
const INTEGER_OPT: SequenceType = SequenceType::optional(ItemType::Atomic(AtomicType::Integer));
const NUMERIC: SequenceType = SequenceType::one(ItemType::Numeric);
const NUMERIC_OPT: SequenceType = SequenceType::optional(ItemType::Numeric);
const DATE_OPT: SequenceType = SequenceType::optional(ItemType::Atomic(AtomicType::Date));
const DATE: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::Date));
const DATE_TIME: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::DateTime));
const DAY_TIME: SequenceType = SequenceType::one(ItemType::Atomic(AtomicType::DayTimeDuration));
const ANY_URI_OPT: SequenceType = SequenceType::optional(ItemType::Atomic(AtomicType::AnyUri));
const DOCUMENT_OPT: SequenceType = SequenceType::optional(ItemType::Node);

fn fns<N: MetapathNode>(local: &str) -> FunctionBuilder<N> {
    Function::builder(ExpandedName::ns(FNS, local))
}

fn define<N: MetapathNode>(lib: &mut FunctionLibrary<N>, builder: FunctionBuilder<N>) {
    if let Err(e) = builder.build().and_then(|f| lib.register(f)) {
        error!(error = %e, "failed to register a standard function");
    }
}

pub(super) fn register_all<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    register_boolean(lib);
    register_sequences(lib);
    register_strings(lib);
    register_numeric(lib);
    register_nodes(lib);
    register_documents(lib);
    register_datetime(lib);
    register_constructors(lib);
}

fn register_boolean<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(lib, fns("true").returns(BOOLEAN).body(boolean::true_fn));
    define(lib, fns("false").returns(BOOLEAN).body(boolean::false_fn));
    define(lib, fns("not").argument("arg", ITEMS).returns(BOOLEAN).body(boolean::not_fn));
    define(lib, fns("boolean").argument("arg", ITEMS).returns(BOOLEAN).body(boolean::boolean_fn));
}

fn register_sequences<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(lib, fns("count").argument("arg", ITEMS).returns(INTEGER).body(sequences::count_fn));
    define(lib, fns("empty").argument("arg", ITEMS).returns(BOOLEAN).body(sequences::empty_fn));
    define(lib, fns("exists").argument("arg", ITEMS).returns(BOOLEAN).body(sequences::exists_fn));
    define(lib, fns("head").argument("arg", ITEMS).returns(ITEM_OPT).body(sequences::head_fn));
    define(lib, fns("tail").argument("arg", ITEMS).returns(ITEMS).body(sequences::tail_fn));
    define(lib, fns("reverse").argument("arg", ITEMS).returns(ITEMS).body(sequences::reverse_fn));
    define(
        lib,
        fns("subsequence")
            .argument("sourceSeq", ITEMS)
            .argument("startingLoc", NUMERIC)
            .returns(ITEMS)
            .body(sequences::subsequence_fn),
    );
    define(
        lib,
        fns("subsequence")
            .argument("sourceSeq", ITEMS)
            .argument("startingLoc", NUMERIC)
            .argument("length", NUMERIC)
            .returns(ITEMS)
            .body(sequences::subsequence_fn),
    );
    define(
        lib,
        fns("distinct-values")
            .argument("arg", ATOMICS)
            .returns(ATOMICS)
            .context_dependent()
            .body(sequences::distinct_values_fn),
    );
    define(lib, fns("exactly-one").argument("arg", ITEMS).returns(ITEM).body(sequences::exactly_one_fn));
    define(lib, fns("one-or-more").argument("arg", ITEMS).returns(ITEMS_PLUS).body(sequences::one_or_more_fn));
    define(lib, fns("zero-or-one").argument("arg", ITEMS).returns(ITEM_OPT).body(sequences::zero_or_one_fn));
    define(lib, fns("last").returns(INTEGER).focus_dependent().body(sequences::last_fn));
    define(lib, fns("position").returns(INTEGER).focus_dependent().body(sequences::position_fn));
}

fn register_strings<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(lib, fns("string").returns(STRING).focus_dependent().body(strings::string_fn));
    define(lib, fns("string").argument("arg", ITEM_OPT).returns(STRING).body(strings::string_fn));
    define(lib, fns("string-length").returns(INTEGER).focus_dependent().body(strings::string_length_fn));
    define(
        lib,
        fns("string-length").argument("arg", STRING_OPT).returns(INTEGER).body(strings::string_length_fn),
    );
    define(
        lib,
        fns("concat")
            .argument("arg1", ATOMIC_OPT)
            .argument("arg2", ATOMIC_OPT)
            .unbounded()
            .returns(STRING)
            .body(strings::concat_fn),
    );
    define(lib, fns("string-join").argument("arg1", ATOMICS).returns(STRING).body(strings::string_join_fn));
    define(
        lib,
        fns("string-join")
            .argument("arg1", ATOMICS)
            .argument("arg2", STRING)
            .returns(STRING)
            .body(strings::string_join_fn),
    );
    for (name, body) in [
        ("starts-with", strings::starts_with_fn::<N> as Body<N>),
        ("ends-with", strings::ends_with_fn::<N>),
        ("contains", strings::contains_fn::<N>),
    ] {
        define(lib, fns(name).argument("arg1", STRING_OPT).argument("arg2", STRING_OPT).returns(BOOLEAN).body(body));
    }
    define(
        lib,
        fns("substring")
            .argument("sourceString", STRING_OPT)
            .argument("start", NUMERIC)
            .returns(STRING)
            .body(strings::substring_fn),
    );
    define(
        lib,
        fns("substring")
            .argument("sourceString", STRING_OPT)
            .argument("start", NUMERIC)
            .argument("length", NUMERIC)
            .returns(STRING)
            .body(strings::substring_fn),
    );
    define(lib, fns("upper-case").argument("arg", STRING_OPT).returns(STRING).body(strings::upper_case_fn));
    define(lib, fns("lower-case").argument("arg", STRING_OPT).returns(STRING).body(strings::lower_case_fn));
    define(lib, fns("normalize-space").returns(STRING).focus_dependent().body(strings::normalize_space_fn));
    define(
        lib,
        fns("normalize-space").argument("arg", STRING_OPT).returns(STRING).body(strings::normalize_space_fn),
    );
    define(
        lib,
        fns("matches")
            .argument("input", STRING_OPT)
            .argument("pattern", STRING)
            .returns(BOOLEAN)
            .body(strings::matches_fn),
    );
    define(
        lib,
        fns("matches")
            .argument("input", STRING_OPT)
            .argument("pattern", STRING)
            .argument("flags", STRING)
            .returns(BOOLEAN)
            .body(strings::matches_fn),
    );
    define(
        lib,
        fns("compare")
            .argument("comparand1", STRING_OPT)
            .argument("comparand2", STRING_OPT)
            .returns(INTEGER_OPT)
            .body(strings::compare_fn),
    );
}

fn register_numeric<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(lib, fns("abs").argument("arg", NUMERIC_OPT).returns(NUMERIC_OPT).body(numeric::abs_fn));
    define(lib, fns("ceiling").argument("arg", NUMERIC_OPT).returns(NUMERIC_OPT).body(numeric::ceiling_fn));
    define(lib, fns("floor").argument("arg", NUMERIC_OPT).returns(NUMERIC_OPT).body(numeric::floor_fn));
    define(lib, fns("round").argument("arg", NUMERIC_OPT).returns(NUMERIC_OPT).body(numeric::round_fn));
    define(lib, fns("sum").argument("arg", ATOMICS).returns(ATOMIC_OPT).context_dependent().body(numeric::sum_fn));
    define(lib, fns("avg").argument("arg", ATOMICS).returns(ATOMIC_OPT).context_dependent().body(numeric::avg_fn));
    define(lib, fns("min").argument("arg", ATOMICS).returns(ATOMIC_OPT).context_dependent().body(numeric::min_fn));
    define(lib, fns("max").argument("arg", ATOMICS).returns(ATOMIC_OPT).context_dependent().body(numeric::max_fn));
}

fn register_nodes<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(lib, fns("data").returns(ATOMICS).focus_dependent().body(nodes::data_fn));
    define(lib, fns("data").argument("arg", ITEMS).returns(ATOMICS).body(nodes::data_fn));
    define(lib, fns("name").returns(STRING).focus_dependent().body(nodes::name_fn));
    define(lib, fns("name").argument("arg", NODE_OPT).returns(STRING).body(nodes::name_fn));
    define(lib, fns("root").returns(NODE).focus_dependent().body(nodes::root_fn));
    define(lib, fns("root").argument("arg", NODE_OPT).returns(NODE_OPT).body(nodes::root_fn));
    define(lib, fns("path").returns(STRING_OPT).focus_dependent().body(nodes::path_fn));
    define(lib, fns("path").argument("arg", NODE_OPT).returns(STRING_OPT).body(nodes::path_fn));
    define(lib, fns("has-children").returns(BOOLEAN).focus_dependent().body(nodes::has_children_fn));
    define(lib, fns("has-children").argument("node", NODE_OPT).returns(BOOLEAN).body(nodes::has_children_fn));
}

fn register_documents<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(
        lib,
        fns("doc").argument("uri", STRING_OPT).returns(DOCUMENT_OPT).context_dependent().body(documents::doc_fn),
    );
    define(
        lib,
        fns("doc-available")
            .argument("uri", STRING_OPT)
            .returns(BOOLEAN)
            .context_dependent()
            .body(documents::doc_available_fn),
    );
    define(lib, fns("base-uri").returns(ANY_URI_OPT).focus_dependent().body(documents::base_uri_fn));
    define(lib, fns("base-uri").argument("arg", NODE_OPT).returns(ANY_URI_OPT).body(documents::base_uri_fn));
    define(lib, fns("document-uri").returns(ANY_URI_OPT).focus_dependent().body(documents::document_uri_fn));
    define(
        lib,
        fns("document-uri").argument("arg", NODE_OPT).returns(ANY_URI_OPT).body(documents::document_uri_fn),
    );
    define(
        lib,
        fns("resolve-uri")
            .argument("relative", STRING_OPT)
            .returns(ANY_URI_OPT)
            .context_dependent()
            .body(documents::resolve_uri_fn),
    );
    define(
        lib,
        fns("resolve-uri")
            .argument("relative", STRING_OPT)
            .argument("base", STRING)
            .returns(ANY_URI_OPT)
            .body(documents::resolve_uri_fn),
    );
}

fn register_datetime<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    define(
        lib,
        fns("current-dateTime").returns(DATE_TIME).context_dependent().body(datetime::current_date_time_fn),
    );
    define(lib, fns("current-date").returns(DATE).context_dependent().body(datetime::current_date_fn));
    define(
        lib,
        fns("implicit-timezone").returns(DAY_TIME).context_dependent().body(datetime::implicit_timezone_fn),
    );
    define(lib, fns("year-from-date").argument("arg", DATE_OPT).returns(INTEGER_OPT).body(datetime::year_from_date_fn));
    define(
        lib,
        fns("month-from-date").argument("arg", DATE_OPT).returns(INTEGER_OPT).body(datetime::month_from_date_fn),
    );
    define(lib, fns("day-from-date").argument("arg", DATE_OPT).returns(INTEGER_OPT).body(datetime::day_from_date_fn));
    define(
        lib,
        fns("years-from-duration")
            .argument("arg", ATOMIC_OPT)
            .returns(INTEGER_OPT)
            .body(datetime::years_from_duration_fn),
    );
    define(
        lib,
        fns("days-from-duration")
            .argument("arg", ATOMIC_OPT)
            .returns(INTEGER_OPT)
            .body(datetime::days_from_duration_fn),
    );
}

fn register_constructors<N: MetapathNode>(lib: &mut FunctionLibrary<N>) {
    for target in AtomicType::ALL {
        define(
            lib,
            Function::builder(ExpandedName::ns(XS, target.local_name()))
                .argument("arg", ATOMIC_OPT)
                .returns(SequenceType::optional(ItemType::Atomic(target)))
                .body(move |_, args| constructors::construct(target, args)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::simple::SimpleNode;
    use rstest::rstest;

    #[rstest]
    #[case("concat", 2)]
    #[case("concat", 7)]
    #[case("subsequence", 3)]
    #[case("string", 0)]
    #[case("last", 0)]
    #[case("doc", 1)]
    fn standard_library_resolves(#[case] local: &str, #[case] arity: usize) {
        let lib: FunctionLibrary<SimpleNode> = FunctionLibrary::standard();
        assert!(lib.lookup(&ExpandedName::ns(FNS, local), arity).is_some());
        assert!(lib.lookup_local(local, arity).is_some());
    }

    #[rstest]
    fn constructors_live_in_the_schema_namespace() {
        let lib: FunctionLibrary<SimpleNode> = FunctionLibrary::standard();
        for t in AtomicType::ALL {
            assert!(lib.lookup(&ExpandedName::ns(XS, t.local_name()), 1).is_some(), "{t}");
        }
        assert!(lib.lookup(&ExpandedName::ns(FNS, "concat"), 1).is_none());
    }
}
