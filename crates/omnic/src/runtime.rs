//! The runtime WAT library bundled into every emitted module.
//!
//! Layout contract shared with the emitter and the collector:
//! - memory cell 1020 holds the heap bump pointer (advanced atomically)
//! - the shadow stack occupies [1024, 9216)
//! - interned strings live in static data from 9216 up to the heap base
//! - the heap begins at 10240
//! - every allocation carries a 16-byte header at payload-16:
//!   [next_allocated | size | mark | type_id], sizes 8-byte aligned
//!
//! Reserved type ids: 0 string, 1 array header, 2 map header, 20 array
//! buffer, 21 map buckets, 22 map entry; user classes are 10+.

/// Globals, allocator, mark phase, strings, arrays, maps, and the path
/// helpers. Identical for both build targets.
pub const RUNTIME_CORE: &str = r#"
;; --- Built-in Memory & String Library ---
(global $free_list (mut i32) (i32.const 0))
(global $allocated_list (mut i32) (i32.const 0))
(global $shadow_stack_base (mut i32) (i32.const 1024))
(global $shadow_stack_ptr (mut i32) (i32.const 1024))

(func $malloc (param $size i32) (param $type_id i32) (result i32)
  (local $block i32)

  ;; Align payload to 8 bytes
  local.get $size
  i32.const 7
  i32.add
  i32.const -8
  i32.and
  local.set $size

  ;; Claim [block, block + size + 16) by atomically advancing the bump
  ;; pointer cell; concurrent allocations cannot interleave.
  i32.const 1020
  local.get $size
  i32.const 16
  i32.add
  i32.atomic.rmw.add
  local.set $block

  ;; Thread onto the allocated list (next_allocated at offset 0)
  local.get $block
  global.get $allocated_list
  i32.store
  local.get $block
  global.set $allocated_list

  ;; Payload size at offset 4
  local.get $block
  i32.const 4
  i32.add
  local.get $size
  i32.store

  ;; Clear mark (offset 8)
  local.get $block
  i32.const 8
  i32.add
  i32.const 0
  i32.store

  ;; Type id (offset 12)
  local.get $block
  i32.const 12
  i32.add
  local.get $type_id
  i32.store

  ;; Return payload pointer
  local.get $block
  i32.const 16
  i32.add
)

(func $free (param $ptr i32)
  ;; No-op, the collector owns liveness
)

(func $gc_mark (param $ptr i32)
  (local $header i32)
  (local $type_id i32)

  local.get $ptr
  i32.eqz
  if
    return
  end

  ;; Ignore anything below the heap base; interned strings and host
  ;; handles are not collectable.
  local.get $ptr
  i32.const 10240
  i32.lt_u
  if
    return
  end

  local.get $ptr
  i32.const 16
  i32.sub
  local.set $header

  ;; Already marked (offset 8)?
  local.get $header
  i32.const 8
  i32.add
  i32.load
  if
    return
  end

  local.get $header
  i32.const 8
  i32.add
  i32.const 1
  i32.store

  ;; Trace children by type id (offset 12)
  local.get $header
  i32.const 12
  i32.add
  i32.load
  local.set $type_id

  local.get $ptr
  local.get $type_id
  call $gc_trace
)

(func $strlen (param $str i32) (result i32)
  (local $len i32)
  (local $ptr i32)
  local.get $str
  local.set $ptr
  (block $break
    (loop $top
      local.get $ptr
      i32.load8_u
      i32.eqz
      br_if $break
      local.get $len
      i32.const 1
      i32.add
      local.set $len
      local.get $ptr
      i32.const 1
      i32.add
      local.set $ptr
      br $top
    )
  )
  local.get $len
)

(func $str_concat (param $s1 i32) (param $s2 i32) (result i32)
  (local $len1 i32)
  (local $len2 i32)
  (local $new_ptr i32)
  (local $dest i32)
  (local $src i32)
  local.get $s1
  call $strlen
  local.set $len1
  local.get $s2
  call $strlen
  local.set $len2
  local.get $len1
  local.get $len2
  i32.add
  i32.const 1
  i32.add
  i32.const 0 ;; TypeID 0 (String)
  call $malloc
  local.set $new_ptr
  local.get $new_ptr
  local.set $dest
  local.get $s1
  local.set $src
  (block $b1 (loop $l1
     local.get $src
     i32.load8_u
     i32.eqz
     br_if $b1
     local.get $dest
     local.get $src
     i32.load8_u
     i32.store8
     local.get $dest
     i32.const 1
     i32.add
     local.set $dest
     local.get $src
     i32.const 1
     i32.add
     local.set $src
     br $l1
  ))
  local.get $s2
  local.set $src
  (block $b2 (loop $l2
     local.get $src
     i32.load8_u
     i32.eqz
     br_if $b2
     local.get $dest
     local.get $src
     i32.load8_u
     i32.store8
     local.get $dest
     i32.const 1
     i32.add
     local.set $dest
     local.get $src
     i32.const 1
     i32.add
     local.set $src
     br $l2
  ))
  local.get $dest
  i32.const 0
  i32.store8
  local.get $new_ptr
)

(func $string_substring (param $str i32) (param $start i32) (param $end i32) (result i32)
  (local $len i32)
  (local $new_ptr i32)
  (local $src i32)
  (local $dest i32)
  (local $i i32)

  local.get $end
  local.get $start
  i32.sub
  local.set $len

  ;; Allocate new string (len + 1 for null terminator)
  local.get $len
  i32.const 1
  i32.add
  i32.const 0 ;; TypeID 0 (String)
  call $malloc
  local.set $new_ptr

  local.get $str
  local.get $start
  i32.add
  local.set $src

  local.get $new_ptr
  local.set $dest

  i32.const 0
  local.set $i

  (block $done_copy
    (loop $copy
      local.get $i
      local.get $len
      i32.ge_u
      br_if $done_copy

      local.get $dest
      local.get $i
      i32.add

      local.get $src
      local.get $i
      i32.add
      i32.load8_u

      i32.store8

      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $copy
    )
  )

  ;; Null terminate
  local.get $dest
  local.get $len
  i32.add
  i32.const 0
  i32.store8

  local.get $new_ptr
)

(func $string_charCodeAt (param $str i32) (param $index i32) (result i32)
  local.get $str
  local.get $index
  i32.add
  i32.load8_u
)

(func $string_equals (param $s1 i32) (param $s2 i32) (result i32)
  (local $len1 i32)
  (local $len2 i32)
  (local $i i32)

  local.get $s1
  call $strlen
  local.set $len1

  local.get $s2
  call $strlen
  local.set $len2

  local.get $len1
  local.get $len2
  i32.ne
  if
    i32.const 0
    return
  end

  i32.const 0
  local.set $i

  (block $done
    (loop $loop
      local.get $i
      local.get $len1
      i32.ge_u
      br_if $done

      local.get $s1
      local.get $i
      i32.add
      i32.load8_u

      local.get $s2
      local.get $i
      i32.add
      i32.load8_u

      i32.ne
      if
        i32.const 0
        return
      end

      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $loop
    )
  )
  i32.const 1
)

(func $hash_string (param $str i32) (result i32)
  ;; djb2 hash
  (local $hash i32)
  (local $c i32)
  (local $i i32)
  (local $len i32)

  i32.const 5381
  local.set $hash

  local.get $str
  call $strlen
  local.set $len

  i32.const 0
  local.set $i

  (block $done
    (loop $loop
      local.get $i
      local.get $len
      i32.ge_u
      br_if $done

      local.get $str
      local.get $i
      i32.add
      i32.load8_u
      local.set $c

      ;; hash = ((hash << 5) + hash) + c
      local.get $hash
      i32.const 5
      i32.shl
      local.get $hash
      i32.add
      local.get $c
      i32.add
      local.set $hash

      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $loop
    )
  )

  local.get $hash
)

(func $string_indexOfChar (param $str i32) (param $ch i32) (result i32)
  (local $i i32)
  (local $c i32)
  (block $done
    (loop $scan
      local.get $str
      local.get $i
      i32.add
      i32.load8_u
      local.set $c
      local.get $c
      i32.eqz
      br_if $done
      local.get $c
      local.get $ch
      i32.eq
      if
        local.get $i
        return
      end
      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $scan
    )
  )
  i32.const -1
)

(func $string_lastIndexOfChar (param $str i32) (param $ch i32) (result i32)
  (local $i i32)
  (local $c i32)
  (local $found i32)
  i32.const -1
  local.set $found
  (block $done
    (loop $scan
      local.get $str
      local.get $i
      i32.add
      i32.load8_u
      local.set $c
      local.get $c
      i32.eqz
      br_if $done
      local.get $c
      local.get $ch
      i32.eq
      if
        local.get $i
        local.set $found
      end
      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $scan
    )
  )
  local.get $found
)

(func $itos (param $n i32) (result i32)
  (local $buf i32)
  (local $i i32)
  (local $j i32)
  (local $neg i32)
  (local $c i32)

  ;; 12 bytes covers a sign, 10 digits and the terminator
  i32.const 12
  i32.const 0 ;; TypeID 0 (String)
  call $malloc
  local.set $buf

  local.get $n
  i32.eqz
  if
    local.get $buf
    i32.const 48 ;; '0'
    i32.store8
    local.get $buf
    i32.const 1
    i32.add
    i32.const 0
    i32.store8
    local.get $buf
    return
  end

  local.get $n
  i32.const 0
  i32.lt_s
  if
    i32.const 1
    local.set $neg
    ;; Negate; INT_MIN wraps and the unsigned digit loop below handles it
    i32.const 0
    local.get $n
    i32.sub
    local.set $n
  end

  ;; Digits in reverse order
  (block $digits_done
    (loop $digits
      local.get $n
      i32.eqz
      br_if $digits_done
      local.get $buf
      local.get $i
      i32.add
      local.get $n
      i32.const 10
      i32.rem_u
      i32.const 48
      i32.add
      i32.store8
      local.get $n
      i32.const 10
      i32.div_u
      local.set $n
      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $digits
    )
  )

  local.get $neg
  if
    local.get $buf
    local.get $i
    i32.add
    i32.const 45 ;; '-'
    i32.store8
    local.get $i
    i32.const 1
    i32.add
    local.set $i
  end

  ;; Terminate, then reverse in place
  local.get $buf
  local.get $i
  i32.add
  i32.const 0
  i32.store8

  i32.const 0
  local.set $j
  local.get $i
  i32.const 1
  i32.sub
  local.set $i
  (block $rev_done
    (loop $rev
      local.get $j
      local.get $i
      i32.ge_s
      br_if $rev_done
      local.get $buf
      local.get $j
      i32.add
      i32.load8_u
      local.set $c
      local.get $buf
      local.get $j
      i32.add
      local.get $buf
      local.get $i
      i32.add
      i32.load8_u
      i32.store8
      local.get $buf
      local.get $i
      i32.add
      local.get $c
      i32.store8
      local.get $j
      i32.const 1
      i32.add
      local.set $j
      local.get $i
      i32.const 1
      i32.sub
      local.set $i
      br $rev
    )
  )
  local.get $buf
)

(func $array_new (param $capacity i32) (result i32)
  (local $arr i32)
  (local $data i32)

  ;; Allocate Array struct (12 bytes: len, cap, data)
  i32.const 12
  i32.const 1 ;; TypeID 1 (Array)
  call $malloc
  local.set $arr

  ;; Set length = 0
  local.get $arr
  i32.const 0
  i32.store

  ;; Set capacity
  local.get $arr
  i32.const 4
  i32.add
  local.get $capacity
  i32.store

  ;; Allocate data buffer
  local.get $capacity
  i32.const 4
  i32.mul
  i32.const 20 ;; TypeID 20 (ArrayData)
  call $malloc
  local.set $data

  ;; Set data pointer
  local.get $arr
  i32.const 8
  i32.add
  local.get $data
  i32.store

  local.get $arr
)

(func $array_push (param $arr i32) (param $val i32)
  (local $len i32)
  (local $cap i32)
  (local $data i32)
  (local $new_cap i32)
  (local $new_data i32)
  (local $i i32)

  local.get $arr
  i32.load
  local.set $len

  local.get $arr
  i32.const 4
  i32.add
  i32.load
  local.set $cap

  local.get $arr
  i32.const 8
  i32.add
  i32.load
  local.set $data

  local.get $len
  local.get $cap
  i32.ge_u
  if
    ;; Resize: double capacity, at least 4
    local.get $cap
    i32.const 2
    i32.mul
    local.set $new_cap

    local.get $new_cap
    i32.const 4
    i32.lt_u
    if
      i32.const 4
      local.set $new_cap
    end

    local.get $new_cap
    i32.const 4
    i32.mul
    i32.const 20 ;; TypeID 20
    call $malloc
    local.set $new_data

    ;; Copy old data
    i32.const 0
    local.set $i
    (block $done_copy
      (loop $copy
        local.get $i
        local.get $len
        i32.ge_u
        br_if $done_copy

        local.get $new_data
        local.get $i
        i32.const 4
        i32.mul
        i32.add

        local.get $data
        local.get $i
        i32.const 4
        i32.mul
        i32.add
        i32.load

        i32.store

        local.get $i
        i32.const 1
        i32.add
        local.set $i
        br $copy
      )
    )

    local.get $arr
    i32.const 4
    i32.add
    local.get $new_cap
    i32.store

    local.get $arr
    i32.const 8
    i32.add
    local.get $new_data
    i32.store

    local.get $new_data
    local.set $data
  end

  ;; Store value
  local.get $data
  local.get $len
  i32.const 4
  i32.mul
  i32.add
  local.get $val
  i32.store

  ;; Increment length
  local.get $arr
  local.get $len
  i32.const 1
  i32.add
  i32.store
)

(func $array_get (param $arr i32) (param $idx i32) (result i32)
  (local $data i32)
  (local $len i32)

  local.get $arr
  i32.load
  local.set $len

  ;; Out of range reads yield 0
  local.get $idx
  local.get $len
  i32.ge_u
  if
    i32.const 0
    return
  end

  local.get $arr
  i32.const 8
  i32.add
  i32.load
  local.set $data

  local.get $data
  local.get $idx
  i32.const 4
  i32.mul
  i32.add
  i32.load
)

(func $array_set (param $arr i32) (param $idx i32) (param $val i32)
  (local $data i32)
  (local $len i32)

  local.get $arr
  i32.load
  local.set $len

  ;; Out of range writes are dropped
  local.get $idx
  local.get $len
  i32.ge_u
  if
    return
  end

  local.get $arr
  i32.const 8
  i32.add
  i32.load
  local.set $data

  local.get $data
  local.get $idx
  i32.const 4
  i32.mul
  i32.add
  local.get $val
  i32.store
)

(func $array_length (param $arr i32) (result i32)
  local.get $arr
  i32.load
)

(func $map_new (result i32)
  (local $map i32)
  (local $buckets i32)
  (local $i i32)

  ;; Allocate Map (12 bytes: capacity, count, buckets)
  i32.const 12
  i32.const 2 ;; TypeID 2 (Map)
  call $malloc
  local.set $map

  ;; Set capacity = 16
  local.get $map
  i32.const 16
  i32.store

  ;; Set count = 0
  local.get $map
  i32.const 4
  i32.add
  i32.const 0
  i32.store

  ;; Allocate buckets (16 * 4 bytes)
  i32.const 64
  i32.const 21 ;; TypeID 21 (MapBuckets)
  call $malloc
  local.set $buckets

  ;; The allocator does not zero memory, clear the buckets explicitly
  i32.const 0
  local.set $i
  (block $done_zero
    (loop $zero
      local.get $i
      i32.const 64
      i32.ge_u
      br_if $done_zero

      local.get $buckets
      local.get $i
      i32.add
      i32.const 0
      i32.store

      local.get $i
      i32.const 4
      i32.add
      local.set $i
      br $zero
    )
  )

  ;; Set buckets ptr
  local.get $map
  i32.const 8
  i32.add
  local.get $buckets
  i32.store

  local.get $map
)

(func $map_set (param $map i32) (param $key i32) (param $val i32)
  (local $hash i32)
  (local $cap i32)
  (local $buckets i32)
  (local $idx i32)
  (local $entry i32)

  local.get $key
  call $hash_string
  local.set $hash

  local.get $map
  i32.load
  local.set $cap

  local.get $map
  i32.const 8
  i32.add
  i32.load
  local.set $buckets

  ;; Capacity is a power of two: index = hash & (cap - 1)
  local.get $hash
  local.get $cap
  i32.const 1
  i32.sub
  i32.and
  local.set $idx

  ;; Walk the chain at buckets[idx]
  local.get $buckets
  local.get $idx
  i32.const 4
  i32.mul
  i32.add
  i32.load
  local.set $entry

  (block $not_found
    (loop $search
      local.get $entry
      i32.eqz
      br_if $not_found

      local.get $entry
      i32.load ;; key at offset 0
      local.get $key
      call $string_equals
      if
        ;; Existing key, update value in place
        local.get $entry
        i32.const 4
        i32.add
        local.get $val
        i32.store
        return
      end

      local.get $entry
      i32.const 8
      i32.add
      i32.load ;; next at offset 8
      local.set $entry
      br $search
    )
  )

  ;; New entry (12 bytes: key, value, next), prepended to the chain
  i32.const 12
  i32.const 22 ;; TypeID 22 (MapEntry)
  call $malloc
  local.set $entry

  local.get $entry
  local.get $key
  i32.store

  local.get $entry
  i32.const 4
  i32.add
  local.get $val
  i32.store

  local.get $entry
  i32.const 8
  i32.add

  local.get $buckets
  local.get $idx
  i32.const 4
  i32.mul
  i32.add
  i32.load

  i32.store

  local.get $buckets
  local.get $idx
  i32.const 4
  i32.mul
  i32.add
  local.get $entry
  i32.store

  ;; Increment count
  local.get $map
  i32.const 4
  i32.add

  local.get $map
  i32.const 4
  i32.add
  i32.load
  i32.const 1
  i32.add

  i32.store

  ;; TODO: Resize once the load factor passes 1
)

(func $map_get (param $map i32) (param $key i32) (result i32)
  (local $hash i32)
  (local $cap i32)
  (local $buckets i32)
  (local $idx i32)
  (local $entry i32)

  local.get $key
  call $hash_string
  local.set $hash

  local.get $map
  i32.load
  local.set $cap

  local.get $map
  i32.const 8
  i32.add
  i32.load
  local.set $buckets

  local.get $hash
  local.get $cap
  i32.const 1
  i32.sub
  i32.and
  local.set $idx

  local.get $buckets
  local.get $idx
  i32.const 4
  i32.mul
  i32.add
  i32.load
  local.set $entry

  (block $not_found
    (loop $search
      local.get $entry
      i32.eqz
      br_if $not_found

      local.get $entry
      i32.load
      local.get $key
      call $string_equals
      if
        local.get $entry
        i32.const 4
        i32.add
        i32.load
        return
      end

      local.get $entry
      i32.const 8
      i32.add
      i32.load
      local.set $entry
      br $search
    )
  )

  ;; Miss reads as 0
  i32.const 0
)

(func $path_basename (param $path i32) (result i32)
  (local $idx i32)
  local.get $path
  i32.const 47 ;; '/'
  call $string_lastIndexOfChar
  local.set $idx
  local.get $idx
  i32.const -1
  i32.eq
  if
    ;; No separator: managed copy of the whole path
    local.get $path
    i32.const 0
    local.get $path
    call $strlen
    call $string_substring
    return
  end
  local.get $path
  local.get $idx
  i32.const 1
  i32.add
  local.get $path
  call $strlen
  call $string_substring
)

(func $path_dirname (param $path i32) (result i32)
  (local $idx i32)
  (local $dot i32)
  local.get $path
  i32.const 47 ;; '/'
  call $string_lastIndexOfChar
  local.set $idx
  local.get $idx
  i32.const -1
  i32.eq
  if
    ;; No separator: "."
    i32.const 2
    i32.const 0 ;; TypeID 0 (String)
    call $malloc
    local.set $dot
    local.get $dot
    i32.const 46 ;; '.'
    i32.store8
    local.get $dot
    i32.const 1
    i32.add
    i32.const 0
    i32.store8
    local.get $dot
    return
  end
  local.get $idx
  i32.eqz
  if
    ;; Root-relative path: keep the leading "/"
    local.get $path
    i32.const 0
    i32.const 1
    call $string_substring
    return
  end
  local.get $path
  i32.const 0
  local.get $idx
  call $string_substring
)

(func $path_extname (param $path i32) (result i32)
  (local $slash i32)
  (local $dot i32)
  (local $empty i32)
  local.get $path
  i32.const 47 ;; '/'
  call $string_lastIndexOfChar
  local.set $slash
  local.get $path
  i32.const 46 ;; '.'
  call $string_lastIndexOfChar
  local.set $dot

  ;; The dot must sit inside the basename and not lead it
  local.get $dot
  local.get $slash
  i32.const 1
  i32.add
  i32.gt_s
  if
    local.get $path
    local.get $dot
    local.get $path
    call $strlen
    call $string_substring
    return
  end

  i32.const 1
  i32.const 0 ;; TypeID 0 (String)
  call $malloc
  local.set $empty
  local.get $empty
  i32.const 0
  i32.store8
  local.get $empty
)

(func $path_join2 (param $a i32) (param $b i32) (result i32)
  (local $sep i32)
  i32.const 2
  i32.const 0 ;; TypeID 0 (String)
  call $malloc
  local.set $sep
  local.get $sep
  i32.const 47 ;; '/'
  i32.store8
  local.get $sep
  i32.const 1
  i32.add
  i32.const 0
  i32.store8
  local.get $a
  local.get $sep
  call $str_concat
  local.get $b
  call $str_concat
)
"#;

/// The sweeping collector, emitted on the browser target where a module
/// instance is single-threaded.
pub const GC_COLLECT_SWEEPING: &str = r#"
(func $gc_collect
  (local $scan_ptr i32)
  (local $curr i32)
  (local $prev i32)
  (local $next i32)
  (local $marked i32)

  ;; 1. Mark Phase: every 4-byte slot of the shadow window is a root
  global.get $shadow_stack_base
  local.set $scan_ptr

  (block $done_scan
    (loop $scan
       local.get $scan_ptr
       global.get $shadow_stack_ptr
       i32.ge_u
       br_if $done_scan

       local.get $scan_ptr
       i32.load
       call $gc_mark

       local.get $scan_ptr
       i32.const 4
       i32.add
       local.set $scan_ptr
       br $scan
    )
  )

  ;; 2. Sweep Phase: walk the allocated list, unlink unmarked blocks
  global.get $allocated_list
  local.set $curr
  i32.const 0
  local.set $prev

  (block $done_sweep
    (loop $sweep
      local.get $curr
      i32.eqz
      br_if $done_sweep

      local.get $curr
      i32.load ;; next_allocated
      local.set $next

      local.get $curr
      i32.const 8
      i32.add
      i32.load
      local.set $marked

      local.get $marked
      if
        ;; Survivor: clear the mark for the next cycle
        local.get $curr
        i32.const 8
        i32.add
        i32.const 0
        i32.store

        local.get $curr
        local.set $prev
      else
        ;; Garbage: unlink from the allocated list
        local.get $prev
        i32.eqz
        if
          local.get $next
          global.set $allocated_list
        else
          local.get $prev
          local.get $next
          i32.store
        end

        ;; Chain onto the free list through the mark word
        local.get $curr
        i32.const 8
        i32.add
        global.get $free_list
        i32.store

        local.get $curr
        global.set $free_list
      end

      local.get $next
      local.set $curr
      br $sweep
    )
  )
)
"#;

/// The wasi target runs threads over shared memory; a single-thread sweep
/// against per-instance root globals would free another thread's data, so
/// collection is deferred there.
pub const GC_COLLECT_NOOP: &str = r#"
(func $gc_collect
  ;; Deferred on the shared-memory target; the shadow-stack protocol is
  ;; kept in place so a concurrent collector can drop in.
)
"#;

/// WASI syscall wrappers plus the thread bootstrap exports.
pub const RUNTIME_WASI: &str = r#"
(func $_initialize
  ;; Seed the heap bump pointer; the host runs this once on the main
  ;; instance before dispatching main.
  i32.const 1020
  i32.const 10240
  i32.store
)

(func $_set_stack_pointer (param $ptr i32)
  ;; A spawned thread hands in its own shadow-stack region
  local.get $ptr
  global.set $shadow_stack_base
  local.get $ptr
  global.set $shadow_stack_ptr
)

(func $wasi_print (param $str i32)
  (local $len i32)
  (local $iov i32)

  local.get $str
  call $strlen
  local.set $len

  ;; iovec [ptr, len] on the heap
  i32.const 8
  i32.const 0
  call $malloc
  local.set $iov

  local.get $iov
  local.get $str
  i32.store

  local.get $iov
  i32.const 4
  i32.add
  local.get $len
  i32.store

  ;; fd_write(1, iov, 1, written_ptr); reuse iov for the written count
  i32.const 1
  local.get $iov
  i32.const 1
  local.get $iov
  call $fd_write
  drop

  ;; Trailing newline
  i32.const 2
  i32.const 0
  call $malloc
  local.set $str
  local.get $str
  i32.const 10 ;; '\n'
  i32.store8
  local.get $str
  i32.const 1
  i32.add
  i32.const 0
  i32.store8

  i32.const 8
  i32.const 0
  call $malloc
  local.set $iov
  local.get $iov
  local.get $str
  i32.store
  local.get $iov
  i32.const 4
  i32.add
  i32.const 1
  i32.store

  i32.const 1
  local.get $iov
  i32.const 1
  local.get $iov
  call $fd_write
  drop
)

(func $fs_writeFile (param $path i32) (param $content i32)
  (local $path_len i32)
  (local $fd_ptr i32)
  (local $fd i32)
  (local $content_len i32)
  (local $iovs i32)
  (local $nwritten i32)

  local.get $path
  call $strlen
  local.set $path_len

  i32.const 4
  i32.const 0
  call $malloc
  local.set $fd_ptr

  ;; path_open(dirfd=3, dirflags=0, path, len, oflags=CREAT|TRUNC,
  ;;           rights=fd_write, inheriting=0, fdflags=0, fd_ptr)
  i32.const 3
  i32.const 0
  local.get $path
  local.get $path_len
  i32.const 9 ;; CREAT|TRUNC
  i64.const 64 ;; RIGHT_FD_WRITE
  i64.const 0
  i32.const 0
  local.get $fd_ptr
  call $path_open
  drop

  local.get $fd_ptr
  i32.load
  local.set $fd

  local.get $content
  call $strlen
  local.set $content_len

  i32.const 8
  i32.const 0
  call $malloc
  local.set $iovs

  local.get $iovs
  local.get $content
  i32.store
  local.get $iovs
  i32.const 4
  i32.add
  local.get $content_len
  i32.store

  i32.const 4
  i32.const 0
  call $malloc
  local.set $nwritten

  local.get $fd
  local.get $iovs
  i32.const 1
  local.get $nwritten
  call $fd_write
  drop

  local.get $fd
  call $fd_close
  drop
)

(func $fs_readFile (param $path i32) (result i32)
  (local $path_len i32)
  (local $fd_ptr i32)
  (local $fd i32)
  (local $stat i32)
  (local $size i32)
  (local $buf i32)
  (local $iovs i32)
  (local $nread i32)

  local.get $path
  call $strlen
  local.set $path_len

  i32.const 4
  i32.const 0
  call $malloc
  local.set $fd_ptr

  ;; rights: fd_read | fd_filestat_get
  i32.const 3
  i32.const 0
  local.get $path
  local.get $path_len
  i32.const 0
  i64.const 2097154
  i64.const 0
  i32.const 0
  local.get $fd_ptr
  call $path_open
  drop

  local.get $fd_ptr
  i32.load
  local.set $fd

  ;; Stat for the file size (u64 at offset 32 of the filestat)
  i32.const 64
  i32.const 0
  call $malloc
  local.set $stat
  local.get $fd
  local.get $stat
  call $fd_filestat_get
  drop
  local.get $stat
  i32.const 32
  i32.add
  i64.load
  i32.wrap_i64
  local.set $size

  ;; Managed string of size + 1
  local.get $size
  i32.const 1
  i32.add
  i32.const 0 ;; TypeID 0 (String)
  call $malloc
  local.set $buf

  i32.const 8
  i32.const 0
  call $malloc
  local.set $iovs
  local.get $iovs
  local.get $buf
  i32.store
  local.get $iovs
  i32.const 4
  i32.add
  local.get $size
  i32.store

  i32.const 4
  i32.const 0
  call $malloc
  local.set $nread

  local.get $fd
  local.get $iovs
  i32.const 1
  local.get $nread
  call $fd_read
  drop

  ;; Null-terminate
  local.get $buf
  local.get $size
  i32.add
  i32.const 0
  i32.store8

  local.get $fd
  call $fd_close
  drop

  local.get $buf
)

(func $fs_existsSync (param $path i32) (result i32)
  (local $stat i32)
  i32.const 64
  i32.const 0
  call $malloc
  local.set $stat
  ;; errno 0 means the path exists
  i32.const 3
  i32.const 0
  local.get $path
  local.get $path
  call $strlen
  local.get $stat
  call $path_filestat_get
  i32.eqz
)

(func $fs_unlink (param $path i32)
  i32.const 3
  local.get $path
  local.get $path
  call $strlen
  call $path_unlink_file
  drop
)

(func $fs_mkdir (param $path i32)
  i32.const 3
  local.get $path
  local.get $path
  call $strlen
  call $path_create_directory
  drop
)

(func $fs_rmdir (param $path i32)
  i32.const 3
  local.get $path
  local.get $path
  call $strlen
  call $path_remove_directory
  drop
)

(func $std_args (result i32)
  (local $count_ptr i32)
  (local $size_ptr i32)
  (local $count i32)
  (local $argv i32)
  (local $argbuf i32)
  (local $arr i32)
  (local $i i32)
  (local $arg i32)

  i32.const 8
  i32.const 0
  call $malloc
  local.set $count_ptr
  local.get $count_ptr
  i32.const 4
  i32.add
  local.set $size_ptr

  local.get $count_ptr
  local.get $size_ptr
  call $args_sizes_get
  drop

  local.get $count_ptr
  i32.load
  local.set $count

  ;; Pointer table and raw byte buffer for args_get
  local.get $count
  i32.const 4
  i32.mul
  i32.const 20
  call $malloc
  local.set $argv
  local.get $size_ptr
  i32.load
  i32.const 20
  call $malloc
  local.set $argbuf

  local.get $argv
  local.get $argbuf
  call $args_get
  drop

  local.get $count
  call $array_new
  local.set $arr

  (block $done
    (loop $each
      local.get $i
      local.get $count
      i32.ge_u
      br_if $done

      ;; Copy argv[i] into a managed string and push it
      local.get $argv
      local.get $i
      i32.const 4
      i32.mul
      i32.add
      i32.load
      local.set $arg

      local.get $arr
      local.get $arg
      i32.const 0
      local.get $arg
      call $strlen
      call $string_substring
      call $array_push

      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $each
    )
  )
  local.get $arr
)

(func $process_env (result i32)
  (local $count_ptr i32)
  (local $size_ptr i32)
  (local $count i32)
  (local $envv i32)
  (local $envbuf i32)
  (local $map i32)
  (local $i i32)
  (local $entry i32)
  (local $eq i32)

  i32.const 8
  i32.const 0
  call $malloc
  local.set $count_ptr
  local.get $count_ptr
  i32.const 4
  i32.add
  local.set $size_ptr

  local.get $count_ptr
  local.get $size_ptr
  call $environ_sizes_get
  drop

  local.get $count_ptr
  i32.load
  local.set $count

  local.get $count
  i32.const 4
  i32.mul
  i32.const 20
  call $malloc
  local.set $envv
  local.get $size_ptr
  i32.load
  i32.const 20
  call $malloc
  local.set $envbuf

  local.get $envv
  local.get $envbuf
  call $environ_get
  drop

  call $map_new
  local.set $map

  (block $done
    (loop $each
      local.get $i
      local.get $count
      i32.ge_u
      br_if $done

      local.get $envv
      local.get $i
      i32.const 4
      i32.mul
      i32.add
      i32.load
      local.set $entry

      ;; Split KEY=VALUE at the first '='
      local.get $entry
      i32.const 61 ;; '='
      call $string_indexOfChar
      local.set $eq

      local.get $eq
      i32.const -1
      i32.ne
      if
        local.get $map
        local.get $entry
        i32.const 0
        local.get $eq
        call $string_substring
        local.get $entry
        local.get $eq
        i32.const 1
        i32.add
        local.get $entry
        call $strlen
        call $string_substring
        call $map_set
      end

      local.get $i
      i32.const 1
      i32.add
      local.set $i
      br $each
    )
  )
  local.get $map
)
"#;
