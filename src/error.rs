use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::io;
use std::result;


/// A result type using our [`Error`] by default.
pub type Result<T, E = Error> = result::Result<T, E>;


/// A type that can be converted into an owned or borrowed string
/// without failing.
pub trait IntoCowStr: Debug {
    /// Perform the conversion.
    fn into_cow_str(self) -> Cow<'static, str>;
}

impl IntoCowStr for &'static str {
    fn into_cow_str(self) -> Cow<'static, str> {
        Cow::Borrowed(self)
    }
}

impl IntoCowStr for String {
    fn into_cow_str(self) -> Cow<'static, str> {
        Cow::Owned(self)
    }
}


/// An enum providing a rough classification of errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An entity was not found, often a file.
    NotFound,
    /// The caller lacked the necessary permission.
    PermissionDenied,
    /// Data was not valid for the operation.
    InvalidData,
    /// A parameter was incorrect.
    InvalidInput,
    /// An error that does not fall into any other category.
    Other,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "entity not found",
            Self::PermissionDenied => "permission denied",
            Self::InvalidData => "invalid data",
            Self::InvalidInput => "invalid input",
            Self::Other => "other error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl From<io::ErrorKind> for ErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::InvalidData => Self::InvalidData,
            io::ErrorKind::InvalidInput => Self::InvalidInput,
            _ => Self::Other,
        }
    }
}


enum ErrorImpl {
    Io(io::Error),
    Adhoc(ErrorKind, Cow<'static, str>),
    Context {
        context: Cow<'static, str>,
        source: Box<ErrorImpl>,
    },
}

impl ErrorImpl {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(err) => ErrorKind::from(err.kind()),
            Self::Adhoc(kind, ..) => *kind,
            Self::Context { source, .. } => source.kind(),
        }
    }
}

impl Debug for ErrorImpl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut dbg = f.debug_struct(stringify!(Error));
        let mut err = self;
        let mut idx = 0usize;
        loop {
            match err {
                Self::Io(io_err) => {
                    break dbg.field(&format!("error.{idx}"), io_err).finish()
                }
                Self::Adhoc(.., msg) => {
                    break dbg.field(&format!("error.{idx}"), msg).finish()
                }
                Self::Context { context, source } => {
                    let _dbg = dbg.field(&format!("error.{idx}"), context);
                    err = source;
                    idx += 1;
                }
            }
        }
    }
}

impl Display for ErrorImpl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Io(err) => Display::fmt(err, f),
            Self::Adhoc(.., msg) => Display::fmt(msg, f),
            Self::Context { context, .. } => Display::fmt(context, f),
        }
    }
}

impl StdError for ErrorImpl {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(err) => err.source(),
            Self::Adhoc(..) => None,
            Self::Context { source, .. } => Some(&**source),
        }
    }
}


/// The error type used by the library.
///
/// Errors generally form a chain, with higher-level errors typically
/// providing context for lower level ones.
pub struct Error {
    /// The top-most error of the chain.
    error: Box<ErrorImpl>,
}

impl Error {
    #[inline]
    pub(crate) fn with_invalid_data<M>(msg: M) -> Self
    where
        M: IntoCowStr,
    {
        Self {
            error: Box::new(ErrorImpl::Adhoc(ErrorKind::InvalidData, msg.into_cow_str())),
        }
    }

    /// Retrieve a rough error classification in the form of an
    /// [`ErrorKind`].
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Layer the provided context on top of this `Error`, creating a
    /// new error in the process.
    fn layer_context(self, context: Cow<'static, str>) -> Self {
        Self {
            error: Box::new(ErrorImpl::Context {
                context,
                source: self.error,
            }),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(&self.error, f)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let () = write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(err) = source {
            let () = write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}

impl StdError for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(other: io::Error) -> Self {
        Self {
            error: Box::new(ErrorImpl::Io(other)),
        }
    }
}

impl From<Error> for io::Error {
    #[inline]
    fn from(other: Error) -> Self {
        match *other.error {
            ErrorImpl::Io(err) => err,
            _ => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}


/// A trait providing ergonomic chaining capabilities to [`Error`].
pub trait ErrorExt: private::Sealed {
    /// The output type produced by [`context`](Self::context) and
    /// [`with_context`](Self::with_context).
    type Output;

    /// Add context to this error.
    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr;

    /// Add context to this error, using a closure for lazy evaluation.
    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C;
}

impl ErrorExt for Error {
    type Output = Error;

    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr,
    {
        self.layer_context(context.into_cow_str())
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C,
    {
        self.layer_context(f().into_cow_str())
    }
}

impl<T, E> ErrorExt for Result<T, E>
where
    E: ErrorExt,
{
    type Output = Result<T, E::Output>;

    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(err.context(context)),
        }
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(err.with_context(f)),
        }
    }
}

impl ErrorExt for io::Error {
    type Output = Error;

    fn context<C>(self, context: C) -> Self::Output
    where
        C: IntoCowStr,
    {
        Error::from(self).context(context)
    }

    fn with_context<C, F>(self, f: F) -> Self::Output
    where
        C: IntoCowStr,
        F: FnOnce() -> C,
    {
        Error::from(self).with_context(f)
    }
}


mod private {
    use super::Error;
    use super::ErrorExt;

    pub trait Sealed {}

    impl Sealed for Error {}
    impl Sealed for std::io::Error {}
    impl<T, E> Sealed for Result<T, E> where E: ErrorExt {}
}
