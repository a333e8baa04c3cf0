/// Zip multiple iterators into an iterator over flat tuples.
///
/// `zip!(a, b, c)` yields `(a_i, b_i, c_i)` rather than `((a_i, b_i), c_i)`.
#[macro_export]
macro_rules! zip {
    // Implementation calls
    (@flatten |$in:pat_param| $out:expr ) => { // base case for flatten
        |$in| $out
    };
    (@flatten |$in:pat_param| ($($out:tt)*), $_:expr $(,$rest:expr)*) => { // flatten the tuple
        zip!(@flatten |($in, x)| ( $($out)*, x ) $(,$rest)*)
    };
    // Main entry point
    ($iter:expr $(, $rest:expr)*) => {
        $iter $(.zip($rest))*.map(zip!(@flatten |x| (x) $(,$rest)*))
    }
}
