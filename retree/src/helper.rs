pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// オーバーフローを検出する加算。
pub trait SafeAdd: Sized {
    fn safe_add(&self, rhs: &Self) -> Option<Self>;
}

impl SafeAdd for usize {
    fn safe_add(&self, rhs: &Self) -> Option<Self> {
        self.checked_add(*rhs)
    }
}

/// `*dst += *src` を行い、オーバーフローした場合は `f` で生成したエラーを返す。
pub fn safe_add<T, F, E>(dst: &mut T, src: &T, f: F) -> Result<(), E>
where
    T: SafeAdd,
    F: Fn() -> E,
{
    let n = dst.safe_add(src).ok_or_else(f)?;
    *dst = n;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_add() {
        let mut n = 1usize;
        assert_eq!(safe_add(&mut n, &2, || "overflow"), Ok(()));
        assert_eq!(n, 3);

        let mut n = usize::MAX;
        assert_eq!(safe_add(&mut n, &1, || "overflow"), Err("overflow"));
        assert_eq!(n, usize::MAX);
    }
}
